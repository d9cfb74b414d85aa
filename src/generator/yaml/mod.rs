pub mod clash_output;

pub use clash_output::{ClashProxyOutput, CommonProxyOptions};
