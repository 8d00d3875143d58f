//! Inbound message envelope parsing and outbound text reply rendering.
//!
//! Inbound example:
//! ```xml
//! <xml>
//!   <ToUserName><![CDATA[gh_account]]></ToUserName>
//!   <FromUserName><![CDATA[openid]]></FromUserName>
//!   <CreateTime>1348831860</CreateTime>
//!   <MsgType><![CDATA[text]]></MsgType>
//!   <Content><![CDATA[hello]]></Content>
//!   <MsgId>1234567890123456</MsgId>
//! </xml>
//! ```

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("invalid message xml: {0}")]
    Parse(#[from] quick_xml::DeError),
    #[error("writing reply xml: {0}")]
    Render(#[from] quick_xml::Error),
}

/// Message kind. Only text is answered by the model; everything else gets the canned reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Other(String),
}

impl MsgType {
    fn from_wire(s: &str) -> Self {
        if s.trim() == "text" {
            MsgType::Text
        } else {
            MsgType::Other(s.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MsgType::Text => "text",
            MsgType::Other(s) => s,
        }
    }
}

/// Wire shape of the inbound envelope. Unknown tags (CreateTime, MsgId, PicUrl, ...) are skipped.
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "ToUserName")]
    to_user_name: String,
    #[serde(rename = "FromUserName")]
    from_user_name: String,
    #[serde(rename = "MsgType")]
    msg_type: String,
    #[serde(rename = "Content", default)]
    content: Option<String>,
}

/// A message pushed by WeChat to the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub msg_type: MsgType,
    pub content: String,
    pub from_user: String,
    pub to_user: String,
}

impl InboundMessage {
    pub fn parse(xml: &str) -> Result<Self, MessageError> {
        let raw: RawInbound = quick_xml::de::from_str(xml)?;
        Ok(Self {
            msg_type: MsgType::from_wire(&raw.msg_type),
            content: raw.content.unwrap_or_default(),
            from_user: raw.from_user_name,
            to_user: raw.to_user_name,
        })
    }

    /// Start a text reply addressed back to the sender (From/To swapped).
    pub fn reply(&self, content: impl Into<String>, create_time: i64) -> OutboundReply {
        OutboundReply {
            to_user: self.from_user.clone(),
            from_user: self.to_user.clone(),
            create_time,
            content: content.into(),
        }
    }
}

/// Passive text reply. MsgType is always "text".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub to_user: String,
    pub from_user: String,
    pub create_time: i64,
    pub content: String,
}

impl OutboundReply {
    pub fn to_xml(&self) -> Result<String, MessageError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(BytesStart::new("xml")))?;
        write_cdata_element(&mut writer, "ToUserName", &self.to_user)?;
        write_cdata_element(&mut writer, "FromUserName", &self.from_user)?;
        writer.write_event(Event::Start(BytesStart::new("CreateTime")))?;
        writer.write_event(Event::Text(BytesText::new(&self.create_time.to_string())))?;
        writer.write_event(Event::End(BytesEnd::new("CreateTime")))?;
        write_cdata_element(&mut writer, "MsgType", "text")?;
        write_cdata_element(&mut writer, "Content", &self.content)?;
        writer.write_event(Event::End(BytesEnd::new("xml")))?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn write_cdata_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    for section in cdata_sections(value) {
        writer.write_event(Event::CData(BytesCData::new(section)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Split `value` so no section contains `]]>`: the terminator is broken between "]]" and ">".
fn cdata_sections(value: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = value;
    while let Some(i) = rest.find("]]>") {
        sections.push(&rest[..i + 2]);
        rest = &rest[i + 2..];
    }
    sections.push(rest);
    sections
}
