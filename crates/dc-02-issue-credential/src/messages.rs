//! Issue Credential 1.0 messages
//!
//! | `@type` suffix | Direction | Attachments |
//! |----------------|-----------|-------------|
//! | `propose-credential` | holder → issuer | none |
//! | `offer-credential` | issuer → holder | `offers~attach` (`libindy-cred-offer-0`) |
//! | `request-credential` | holder → issuer | `requests~attach` (`libindy-cred-request-0`) |
//! | `issue-credential` | issuer → holder | `credentials~attach` (`libindy-cred-0`) |
//! | `ack` | holder → issuer | none |
//! | `problem-report` | either | none |
//!
//! Linked attachments travel in the generic `~attach` decorator.

use serde::{Deserialize, Serialize};
use shared_types::{
    impl_agent_message, AgentMessage, Attachment, MessageError, MessageHeader, PlaintextMessage,
    ProblemReportBody, ProblemReportDescription, Protocol,
};

use crate::domain::CredentialPreview;

pub const PROTOCOL_NAME: &str = "issue-credential";
pub const PROTOCOL_VERSION: &str = "1.0";

pub const CREDENTIAL_PREVIEW_TYPE: &str =
    "https://didcomm.org/issue-credential/1.0/credential-preview";

pub const INDY_CREDENTIAL_OFFER_ATTACHMENT_ID: &str = "libindy-cred-offer-0";
pub const INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID: &str = "libindy-cred-request-0";
pub const INDY_CREDENTIAL_ATTACHMENT_ID: &str = "libindy-cred-0";

/// Feature registry entry.
pub fn protocol() -> Protocol {
    Protocol::new(
        format!("https://didcomm.org/{PROTOCOL_NAME}/{PROTOCOL_VERSION}"),
        &["holder", "issuer"],
    )
}

fn find_attachment<'a>(attachments: &'a [Attachment], id: &str) -> Option<&'a Attachment> {
    attachments.iter().find(|a| a.id == id)
}

/// `propose-credential`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeCredentialMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_proposal: Option<CredentialPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
}

impl_agent_message!(
    ProposeCredentialMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "propose-credential"
);

impl ProposeCredentialMessage {
    pub fn new(preview: Option<CredentialPreview>) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            comment: None,
            credential_proposal: preview,
            schema_issuer_did: None,
            schema_id: None,
            schema_name: None,
            schema_version: None,
            cred_def_id: None,
            issuer_did: None,
        }
    }
}

/// `offer-credential`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCredentialMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_preview: CredentialPreview,
    #[serde(rename = "offers~attach")]
    pub offer_attachments: Vec<Attachment>,
}

impl_agent_message!(
    OfferCredentialMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "offer-credential"
);

impl OfferCredentialMessage {
    pub fn new(preview: CredentialPreview, offer: Attachment) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            comment: None,
            credential_preview: preview,
            offer_attachments: vec![offer],
        }
    }

    pub fn offer_attachment(&self) -> Option<&Attachment> {
        find_attachment(&self.offer_attachments, INDY_CREDENTIAL_OFFER_ATTACHMENT_ID)
    }

    /// `cred_def_id` inside the offer payload.
    pub fn cred_def_id(&self) -> Option<String> {
        self.offer_attachment()
            .and_then(|a| a.data_as_json().ok())
            .and_then(|json| json.get("cred_def_id")?.as_str().map(str::to_string))
    }
}

/// `request-credential`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCredentialMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "requests~attach")]
    pub request_attachments: Vec<Attachment>,
}

impl_agent_message!(
    RequestCredentialMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "request-credential"
);

impl RequestCredentialMessage {
    pub fn new(request: Attachment) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            comment: None,
            request_attachments: vec![request],
        }
    }

    pub fn request_attachment(&self) -> Option<&Attachment> {
        find_attachment(
            &self.request_attachments,
            INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID,
        )
    }
}

/// `issue-credential`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCredentialMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "credentials~attach")]
    pub credential_attachments: Vec<Attachment>,
}

impl_agent_message!(
    IssueCredentialMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "issue-credential"
);

impl IssueCredentialMessage {
    pub fn new(credential: Attachment) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            comment: None,
            credential_attachments: vec![credential],
        }
    }

    pub fn credential_attachment(&self) -> Option<&Attachment> {
        find_attachment(&self.credential_attachments, INDY_CREDENTIAL_ATTACHMENT_ID)
    }
}

/// Ack status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Ok,
    Fail,
    Pending,
}

/// `ack`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAckMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub status: AckStatus,
}

impl_agent_message!(CredentialAckMessage, PROTOCOL_NAME, PROTOCOL_VERSION, "ack");

impl CredentialAckMessage {
    pub fn new(status: AckStatus, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            status,
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// `problem-report`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialProblemReportMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(flatten)]
    pub body: ProblemReportBody,
}

impl_agent_message!(
    CredentialProblemReportMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "problem-report"
);

impl CredentialProblemReportMessage {
    pub fn new(description: ProblemReportDescription, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            body: ProblemReportBody::new(description),
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// Every inbound credential message, parsed by `@type`.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialMessage {
    Propose(ProposeCredentialMessage),
    Offer(OfferCredentialMessage),
    Request(RequestCredentialMessage),
    Issue(IssueCredentialMessage),
    Ack(CredentialAckMessage),
    ProblemReport(CredentialProblemReportMessage),
}

impl CredentialMessage {
    pub fn parse(plaintext: &PlaintextMessage) -> Result<Self, MessageError> {
        let parsed = plaintext.parsed_type()?;
        if parsed.protocol_name != PROTOCOL_NAME || parsed.major_version != "1" {
            return Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            ));
        }
        match parsed.message_name.as_str() {
            "propose-credential" => Ok(Self::Propose(plaintext.to_typed()?)),
            "offer-credential" => Ok(Self::Offer(plaintext.to_typed()?)),
            "request-credential" => Ok(Self::Request(plaintext.to_typed()?)),
            "issue-credential" => Ok(Self::Issue(plaintext.to_typed()?)),
            "ack" => Ok(Self::Ack(plaintext.to_typed()?)),
            "problem-report" => Ok(Self::ProblemReport(plaintext.to_typed()?)),
            _ => Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Propose(_) => ProposeCredentialMessage::TYPE.message_name,
            Self::Offer(_) => OfferCredentialMessage::TYPE.message_name,
            Self::Request(_) => RequestCredentialMessage::TYPE.message_name,
            Self::Issue(_) => IssueCredentialMessage::TYPE.message_name,
            Self::Ack(_) => CredentialAckMessage::TYPE.message_name,
            Self::ProblemReport(_) => CredentialProblemReportMessage::TYPE.message_name,
        }
    }

    /// Thread the message belongs to.
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Propose(m) => m.thread_id(),
            Self::Offer(m) => m.thread_id(),
            Self::Request(m) => m.thread_id(),
            Self::Issue(m) => m.thread_id(),
            Self::Ack(m) => m.thread_id(),
            Self::ProblemReport(m) => m.thread_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_wire_format() {
        let offer = OfferCredentialMessage::new(
            CredentialPreview::from_pairs([("name", "Alice")]),
            Attachment::from_json_base64(
                INDY_CREDENTIAL_OFFER_ATTACHMENT_ID,
                &json!({"cred_def_id": "cd-1"}),
            ),
        );
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(
            json["@type"],
            "https://didcomm.org/issue-credential/1.0/offer-credential"
        );
        assert_eq!(json["offers~attach"][0]["@id"], "libindy-cred-offer-0");
        assert_eq!(json["credential_preview"]["attributes"][0]["name"], "name");
        assert_eq!(offer.cred_def_id().as_deref(), Some("cd-1"));
    }

    #[test]
    fn test_parse_request_and_lookup_attachment() {
        let plaintext = PlaintextMessage::from_value(json!({
            "@id": "req-1",
            "@type": "https://didcomm.org/issue-credential/1.0/request-credential",
            "~thread": {"thid": "thread-1"},
            "requests~attach": [{
                "@id": "libindy-cred-request-0",
                "data": {"json": {"cred_def_id": "cd-1"}}
            }]
        }))
        .unwrap();

        match CredentialMessage::parse(&plaintext).unwrap() {
            CredentialMessage::Request(request) => {
                assert_eq!(request.thread_id(), "thread-1");
                assert!(request.request_attachment().is_some());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_propose_fields_are_snake_case() {
        let mut proposal =
            ProposeCredentialMessage::new(Some(CredentialPreview::from_pairs([("a", "1")])));
        proposal.cred_def_id = Some("cd-1".into());
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["cred_def_id"], "cd-1");
        assert!(json.get("credential_proposal").is_some());
        assert!(json.get("schema_id").is_none());
    }

    #[test]
    fn test_ack_status_is_uppercase() {
        let ack = CredentialAckMessage::new(AckStatus::Ok, "thread-1");
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["~thread"]["thid"], "thread-1");
    }

    #[test]
    fn test_rejects_other_major_version() {
        let plaintext = PlaintextMessage::from_value(json!({
            "@id": "x",
            "@type": "https://didcomm.org/issue-credential/2.0/offer-credential"
        }))
        .unwrap();
        assert!(CredentialMessage::parse(&plaintext).is_err());
    }
}
