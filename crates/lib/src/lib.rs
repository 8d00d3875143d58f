//! wxgem core library: config, WeChat protocol, Gemini client, prompt form state and the
//! webhook gateway, shared by the CLI and the desktop prompt form.

pub mod config;
pub mod form;
pub mod gateway;
pub mod init;
pub mod llm;
pub mod wechat;
