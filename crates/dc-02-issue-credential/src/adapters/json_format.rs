//! Unsigned JSON credential format
//!
//! Payloads are plain JSON objects carried base64 in the attachments. The
//! offer binds a nonce that the request must echo, and the issued credential
//! must match the credential definition that was requested. Nothing is
//! signed, so this adapter suits development agents and tests only.
//!
//! ```text
//! offer       { schema_id, cred_def_id, nonce }
//! request     { cred_def_id, nonce, prover_did? }
//! credential  { schema_id, cred_def_id, issuer_did, values: { name: { raw } } }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{generate_id, AgentContext, Attachment};
use tracing::debug;

use crate::domain::{
    CredentialExchangeRecord, CredentialPreviewAttribute, METADATA_CREDENTIAL, METADATA_REQUEST,
};
use crate::error::{CredentialError, CredentialProblemReportReason, CredentialResult};
use crate::ports::outbound::{CredentialFormatInput, CredentialFormatService, FormatOutput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonOffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_id: Option<String>,
    cred_def_id: String,
    nonce: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonRequest {
    cred_def_id: String,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prover_did: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawValue {
    raw: String,
}

/// An issued credential as the holder stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    pub cred_def_id: String,
    pub issuer_did: String,
    values: HashMap<String, RawValue>,
}

impl JsonCredential {
    /// Raw value of one attribute.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.raw.as_str())
    }

    fn matches_attributes(&self, attributes: &[CredentialPreviewAttribute]) -> bool {
        attributes.len() == self.values.len()
            && attributes
                .iter()
                .all(|attribute| self.value(&attribute.name) == Some(attribute.value.as_str()))
    }
}

fn decode<T: serde::de::DeserializeOwned>(attachment: &Attachment) -> CredentialResult<T> {
    let value = attachment.data_as_json()?;
    serde_json::from_value(value).map_err(|e| CredentialError::Format(e.to_string()))
}

fn encode<T: Serialize>(attach_id: &str, payload: &T) -> CredentialResult<Attachment> {
    let value = serde_json::to_value(payload).map_err(|e| CredentialError::Format(e.to_string()))?;
    Ok(Attachment::from_json_base64(attach_id, &value))
}

/// Development credential format. Keeps the holder's wallet in memory.
pub struct JsonCredentialFormatService {
    issuer_did: String,
    credentials: Mutex<HashMap<String, JsonCredential>>,
}

impl JsonCredentialFormatService {
    pub fn new(issuer_did: impl Into<String>) -> Self {
        Self {
            issuer_did: issuer_did.into(),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// A credential stored by [`CredentialFormatService::process_credential`].
    pub fn credential(&self, credential_id: &str) -> Option<JsonCredential> {
        self.credentials.lock().get(credential_id).cloned()
    }
}

#[async_trait]
impl CredentialFormatService for JsonCredentialFormatService {
    fn format_key(&self) -> &'static str {
        "json"
    }

    async fn create_offer(
        &self,
        _ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        input: &CredentialFormatInput,
        attach_id: &str,
    ) -> CredentialResult<FormatOutput> {
        if input.cred_def_id.is_empty() {
            return Err(CredentialError::Validation(
                "credential definition id is required to create an offer".into(),
            ));
        }
        if input.attributes.is_empty() {
            return Err(CredentialError::Validation(
                "an offer needs at least one attribute".into(),
            ));
        }

        let offer = JsonOffer {
            schema_id: input.schema_id.clone(),
            cred_def_id: input.cred_def_id.clone(),
            nonce: generate_id(),
        };
        record.set_metadata(
            METADATA_CREDENTIAL,
            json!({
                "schemaId": offer.schema_id,
                "credentialDefinitionId": offer.cred_def_id,
            }),
        );

        Ok(FormatOutput {
            attachment: encode(attach_id, &offer)?,
            preview_attributes: input.attributes.clone(),
        })
    }

    async fn process_offer(
        &self,
        _ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
    ) -> CredentialResult<()> {
        let offer: JsonOffer = decode(offer)?;
        debug!(record_id = %record.id, cred_def_id = %offer.cred_def_id, "Processing json offer");
        record.set_metadata(
            METADATA_CREDENTIAL,
            json!({
                "schemaId": offer.schema_id,
                "credentialDefinitionId": offer.cred_def_id,
            }),
        );
        Ok(())
    }

    async fn accept_offer(
        &self,
        _ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
        attach_id: &str,
    ) -> CredentialResult<Attachment> {
        let offer: JsonOffer = decode(offer)?;
        let request = JsonRequest {
            cred_def_id: offer.cred_def_id,
            nonce: offer.nonce,
            prover_did: None,
        };
        record.set_metadata(METADATA_REQUEST, json!({ "nonce": request.nonce }));
        encode(attach_id, &request)
    }

    async fn process_request(
        &self,
        _ctx: &AgentContext,
        _record: &mut CredentialExchangeRecord,
        request: &Attachment,
    ) -> CredentialResult<()> {
        decode::<JsonRequest>(request).map(|_| ())
    }

    async fn accept_request(
        &self,
        _ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
        request: &Attachment,
        attach_id: &str,
    ) -> CredentialResult<Attachment> {
        let offer: JsonOffer = decode(offer)?;
        let request: JsonRequest = decode(request)?;

        if request.cred_def_id != offer.cred_def_id {
            return Err(CredentialError::Format(format!(
                "request is for credential definition {} but {} was offered",
                request.cred_def_id, offer.cred_def_id
            )));
        }
        if request.nonce != offer.nonce {
            return Err(CredentialError::Format(
                "request nonce does not match the offer".into(),
            ));
        }

        let attributes = record.credential_attributes.as_deref().ok_or_else(|| {
            CredentialError::Validation(format!(
                "Missing required credential attribute values on credential record with id {}",
                record.id
            ))
        })?;
        let values = attributes
            .iter()
            .map(|attribute| {
                (
                    attribute.name.clone(),
                    RawValue {
                        raw: attribute.value.clone(),
                    },
                )
            })
            .collect();

        let credential = JsonCredential {
            schema_id: offer.schema_id,
            cred_def_id: offer.cred_def_id,
            issuer_did: self.issuer_did.clone(),
            values,
        };
        encode(attach_id, &credential)
    }

    async fn process_credential(
        &self,
        _ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        credential: &Attachment,
        request: &Attachment,
    ) -> CredentialResult<()> {
        if record.get_metadata(METADATA_REQUEST).is_none() {
            return Err(CredentialError::ProblemReport {
                message: format!(
                    "Missing required request metadata for credential exchange with thread id {}",
                    record.thread_id
                ),
                reason: CredentialProblemReportReason::IssuanceAbandoned,
            });
        }

        let request: JsonRequest = decode(request)?;
        let credential: JsonCredential = decode(credential)?;
        if credential.cred_def_id != request.cred_def_id {
            return Err(CredentialError::ProblemReport {
                message: format!(
                    "Received credential for definition {} but requested {}",
                    credential.cred_def_id, request.cred_def_id
                ),
                reason: CredentialProblemReportReason::IssuanceAbandoned,
            });
        }

        let credential_id = generate_id();
        self.credentials
            .lock()
            .insert(credential_id.clone(), credential);
        record.credential_ids.push(credential_id);
        Ok(())
    }

    async fn should_auto_respond_to_request(
        &self,
        _ctx: &AgentContext,
        _record: &CredentialExchangeRecord,
        offer: &Attachment,
        request: &Attachment,
    ) -> bool {
        match (decode::<JsonOffer>(offer), decode::<JsonRequest>(request)) {
            (Ok(offer), Ok(request)) => offer.cred_def_id == request.cred_def_id,
            _ => false,
        }
    }

    async fn should_auto_respond_to_credential(
        &self,
        _ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        credential: &Attachment,
        request: &Attachment,
        _offer: Option<&Attachment>,
    ) -> bool {
        let (Ok(credential), Ok(request)) = (
            decode::<JsonCredential>(credential),
            decode::<JsonRequest>(request),
        ) else {
            return false;
        };
        if credential.cred_def_id != request.cred_def_id {
            return false;
        }
        match &record.credential_attributes {
            Some(attributes) => credential.matches_attributes(attributes),
            None => true,
        }
    }
}
