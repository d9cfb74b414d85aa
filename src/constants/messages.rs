//! Localized texts for group names and diagnostics.

use crate::models::Lang;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    DecodeFailed,
    InvalidProxy,
    OverrideSkipped,
    FetchFailed,
    UnsupportedByTarget,
    NoProxies,
}

pub fn message(lang: Lang, key: MessageKey) -> &'static str {
    match lang {
        Lang::ZhCn => match key {
            MessageKey::DecodeFailed => "无法解码订阅内容",
            MessageKey::InvalidProxy => "跳过无效节点",
            MessageKey::OverrideSkipped => "跳过配置覆盖项",
            MessageKey::FetchFailed => "获取远程订阅失败",
            MessageKey::UnsupportedByTarget => "目标格式不支持该节点",
            MessageKey::NoProxies => "未找到可用节点",
        },
        Lang::EnUs => match key {
            MessageKey::DecodeFailed => "Failed to decode subscription content",
            MessageKey::InvalidProxy => "Skipped invalid proxy",
            MessageKey::OverrideSkipped => "Skipped config override",
            MessageKey::FetchFailed => "Failed to fetch remote subscription",
            MessageKey::UnsupportedByTarget => "Proxy not supported by target format",
            MessageKey::NoProxies => "No usable proxy found",
        },
    }
}

pub const AUTO_SELECT: &str = "Auto Select";
pub const NODE_SELECT: &str = "Node Select";
pub const FALL_BACK: &str = "Fall Back";

/// Localized display name of a fixed group or predefined rule category.
///
/// Names without a translation (custom categories) are returned unchanged.
pub fn outbound_name(lang: Lang, name: &str) -> String {
    let (emoji, zh) = match name {
        AUTO_SELECT => ("⚡", "自动选择"),
        NODE_SELECT => ("🚀", "节点选择"),
        FALL_BACK => ("🐟", "漏网之鱼"),
        "Ad Block" => ("🛑", "广告拦截"),
        "AI Services" => ("💬", "AI 服务"),
        "Bilibili" => ("📺", "哔哩哔哩"),
        "Youtube" => ("📹", "油管视频"),
        "Google" => ("🔍", "谷歌服务"),
        "Private" => ("🏠", "私有网络"),
        "Location:CN" => ("🔒", "国内服务"),
        "Telegram" => ("📲", "电报消息"),
        "Github" => ("🐱", "Github"),
        "Microsoft" => ("Ⓜ️", "微软服务"),
        "Apple" => ("🍏", "苹果服务"),
        "Social Media" => ("🌐", "社交媒体"),
        "Streaming" => ("🎬", "流媒体"),
        "Gaming" => ("🎮", "游戏平台"),
        "Education" => ("📚", "教育资源"),
        "Financial" => ("💰", "金融服务"),
        "Cloud Services" => ("☁️", "云服务"),
        "Non-China" => ("🌐", "非中国"),
        _ => return name.to_string(),
    };
    match lang {
        Lang::ZhCn => format!("{} {}", emoji, zh),
        Lang::EnUs => format!("{} {}", emoji, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_name() {
        assert_eq!(outbound_name(Lang::ZhCn, NODE_SELECT), "🚀 节点选择");
        assert_eq!(outbound_name(Lang::EnUs, NODE_SELECT), "🚀 Node Select");
        assert_eq!(outbound_name(Lang::EnUs, "Location:CN"), "🔒 Location:CN");
        assert_eq!(outbound_name(Lang::ZhCn, "My Rule"), "My Rule");
    }

    #[test]
    fn test_message_differs_per_lang() {
        assert_ne!(
            message(Lang::ZhCn, MessageKey::FetchFailed),
            message(Lang::EnUs, MessageKey::FetchFailed)
        );
    }
}
