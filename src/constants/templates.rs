//! Built-in base documents, used when the caller supplies no template.

use serde_json::{json, Value};

pub fn clash_base() -> Value {
    json!({
        "port": 7890,
        "socks-port": 7891,
        "allow-lan": false,
        "mode": "rule",
        "log-level": "info",
        "geodata-mode": true,
        "geo-auto-update": true,
        "geodata-loader": "standard",
        "geo-update-interval": 24,
        "geox-url": {
            "geoip": "https://testingcf.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/geoip.dat",
            "geosite": "https://testingcf.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/geosite.dat",
            "mmdb": "https://testingcf.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/country.mmdb",
            "asn": "https://github.com/xishang0128/geoip/releases/download/latest/GeoLite2-ASN.mmdb"
        },
        "dns": {
            "enable": true,
            "ipv6": true,
            "respect-rules": true,
            "enhanced-mode": "fake-ip",
            "nameserver": ["https://120.53.53.53/dns-query", "https://223.5.5.5/dns-query"],
            "proxy-server-nameserver": ["https://120.53.53.53/dns-query", "https://223.5.5.5/dns-query"],
            "nameserver-policy": {
                "geosite:cn,private": ["https://120.53.53.53/dns-query", "https://223.5.5.5/dns-query"],
                "geosite:geolocation-!cn": ["https://dns.cloudflare.com/dns-query", "https://dns.google/dns-query"]
            }
        },
        "proxies": [],
        "proxy-groups": []
    })
}

pub fn singbox_base() -> Value {
    json!({
        "log": { "disabled": false, "level": "info", "timestamp": true },
        "dns": {
            "servers": [
                { "tag": "dns_proxy", "address": "tcp://1.1.1.1", "address_resolver": "dns_resolver", "strategy": "ipv4_only" },
                { "tag": "dns_direct", "address": "https://dns.alidns.com/dns-query", "address_resolver": "dns_resolver", "strategy": "ipv4_only", "detour": "DIRECT" },
                { "tag": "dns_resolver", "address": "223.5.5.5", "detour": "DIRECT" }
            ],
            "rules": [
                { "outbound": "any", "server": "dns_resolver" }
            ],
            "final": "dns_proxy",
            "independent_cache": true
        },
        "inbounds": [
            { "type": "mixed", "tag": "mixed-in", "listen": "0.0.0.0", "listen_port": 2080 },
            { "type": "tun", "tag": "tun-in", "address": "172.19.0.1/30", "auto_route": true, "strict_route": true, "stack": "mixed", "sniff": true }
        ],
        "outbounds": [
            { "type": "direct", "tag": "DIRECT" },
            { "type": "block", "tag": "REJECT" }
        ],
        "route": { "rule_set": [], "rules": [] },
        "experimental": {
            "cache_file": { "enabled": true, "store_fakeip": true }
        }
    })
}

pub fn surge_base() -> Value {
    json!({
        "general": {
            "allow-wifi-access": false,
            "wifi-access-http-port": 6152,
            "wifi-access-socks5-port": 6153,
            "http-listen": "127.0.0.1:6152",
            "socks5-listen": "127.0.0.1:6153",
            "allow-hotspot-access": false,
            "skip-proxy": "127.0.0.1,192.168.0.0/16,10.0.0.0/8,172.16.0.0/12,100.64.0.0/10,17.0.0.0/8,localhost,*.local,*.crashlytics.com,seed-sequoia.siri.apple.com,sequoia.apple.com",
            "test-timeout": 5,
            "proxy-test-url": "http://cp.cloudflare.com/generate_204",
            "internet-test-url": "http://www.apple.com/library/test/success.html",
            "geoip-maxmind-url": "https://raw.githubusercontent.com/Loyalsoldier/geoip/release/Country.mmdb",
            "ipv6": false,
            "show-error-page-for-reject": true,
            "dns-server": "119.29.29.29, 180.184.1.1, 223.5.5.5, system",
            "encrypted-dns-server": "https://223.5.5.5/dns-query",
            "exclude-simple-hostnames": true,
            "read-etc-hosts": true,
            "always-real-ip": "*.msftconnecttest.com, *.msftncsi.com, *.srv.nintendo.net, *.stun.playstation.net, xbox.*.microsoft.com, *.xboxlive.com, *.logon.battlenet.com.cn, *.logon.battle.net, stun.l.google.com, easy-login.10099.com.cn,*-update.xoyocdn.com, *.prod.cloud.netflix.com, appboot.netflix.com, *-appboot.netflix.com",
            "hijack-dns": "*:53",
            "udp-policy-not-supported-behaviour": "REJECT",
            "hide-vpn-icon": false
        },
        "replica": {
            "hide-apple-request": true,
            "hide-crashlytics-request": true,
            "use-keyword-filter": false,
            "hide-udp": false
        }
    })
}
