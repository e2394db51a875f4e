//! Typed admin command schema and request/reply transport seam.

use crate::config::ConfigError;
use async_trait::async_trait;

/// Maximum length accepted by the target forwarder for inline XML URL
/// content. Splitting oversized configurations across multiple commands is
/// not supported.
pub const XML_URL_MAX_LENGTH: usize = 4096;

/// Inline XML configuration reference embedded in a create command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlUrl {
    pub is_final: bool,
    pub content: String,
}

/// Entity to create: parent entity name plus its XML configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDescription {
    pub name: String,
    pub xml_url: XmlUrl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Create { entity_desc: EntityDescription },
    Delete { entity_name: String },
}

/// Administrative request addressed to one target forwarder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    pub target_router: String,
    pub command: Command,
}

impl CommandRequest {
    /// Builds a create request carrying final inline XML.
    ///
    /// Oversized content is a configuration error, detected before the
    /// request ever reaches the transport.
    pub fn create(
        target_router: &str,
        parent_name: &str,
        xml_content: String,
    ) -> Result<Self, ConfigError> {
        if xml_content.len() > XML_URL_MAX_LENGTH {
            return Err(ConfigError::XmlTooLong {
                length: xml_content.len(),
                maximum: XML_URL_MAX_LENGTH,
            });
        }

        Ok(Self {
            target_router: target_router.to_string(),
            command: Command::Create {
                entity_desc: EntityDescription {
                    name: parent_name.to_string(),
                    xml_url: XmlUrl {
                        is_final: true,
                        content: xml_content,
                    },
                },
            },
        })
    }

    pub fn delete(target_router: &str, entity_name: &str) -> Self {
        Self {
            target_router: target_router.to_string(),
            command: Command::Delete {
                entity_name: entity_name.to_string(),
            },
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self.command {
            Command::Create { .. } => CommandKind::Create,
            Command::Delete { .. } => CommandKind::Delete,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandResponseKind {
    Ok,
    Error,
    EntityNotFound,
}

/// Reply from the target forwarder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponse {
    pub kind: CommandResponseKind,
    pub message: String,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            kind: CommandResponseKind::Ok,
            message: String::new(),
        }
    }

    pub fn error(kind: CommandResponseKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Request/reply client for the forwarder's admin interface.
///
/// Implementations correlate each reply to its request, return `None` when
/// no reply arrives, and never error. The commander serialises calls, so a
/// single in-flight request slot suffices.
#[async_trait]
pub trait AdminEndpoint: Send + Sync {
    async fn send_request(&self, request: CommandRequest) -> Option<CommandResponse>;
}
