use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::applications::domain::ApplicationId;

/// Closed set of supporting documents an application may carry. Each type maps to
/// exactly one object per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Contract,
    IdProof,
    BankStatement,
    PayStub,
    AdditionalDoc,
    PhotoId,
    ProofOfAddress,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Contract,
        DocumentType::IdProof,
        DocumentType::BankStatement,
        DocumentType::PayStub,
        DocumentType::AdditionalDoc,
        DocumentType::PhotoId,
        DocumentType::ProofOfAddress,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::Contract => "contract",
            DocumentType::IdProof => "id_proof",
            DocumentType::BankStatement => "bank_statement",
            DocumentType::PayStub => "pay_stub",
            DocumentType::AdditionalDoc => "additional_doc",
            DocumentType::PhotoId => "photo_id",
            DocumentType::ProofOfAddress => "proof_of_address",
        }
    }

    /// Object name within the application folder.
    pub fn object_name(self) -> String {
        format!("{}.pdf", self.as_str())
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document type '{0}'")]
pub struct UnknownDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        DocumentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| UnknownDocumentType(trimmed.to_string()))
    }
}

/// `lower(last)_lower(first)_id`. Names are case-folded and otherwise used verbatim.
pub fn folder_segment(id: &ApplicationId, last_name: &str, first_name: &str) -> String {
    format!(
        "{}_{}_{}",
        last_name.to_lowercase(),
        first_name.to_lowercase(),
        id.as_str()
    )
}

/// Prefix under which every object of one application lives.
pub fn folder_prefix(id: &ApplicationId, last_name: &str, first_name: &str) -> String {
    format!("{}/", folder_segment(id, last_name, first_name))
}

pub fn derive_key(
    id: &ApplicationId,
    last_name: &str,
    first_name: &str,
    document_type: DocumentType,
) -> String {
    format!(
        "{}/{}",
        folder_segment(id, last_name, first_name),
        document_type.object_name()
    )
}

/// Final path component of a stored key.
pub fn file_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ApplicationId {
        ApplicationId(raw.to_string())
    }

    #[test]
    fn key_folds_case_and_appends_type() {
        let key = derive_key(&id("65f0c1"), "Doe", "John", DocumentType::Contract);
        assert_eq!(key, "doe_john_65f0c1/contract.pdf");
    }

    #[test]
    fn names_keep_inner_whitespace() {
        let key = derive_key(&id("a1"), "Van Dyke", "Mary Ann", DocumentType::PayStub);
        assert_eq!(key, "van dyke_mary ann_a1/pay_stub.pdf");
    }

    #[test]
    fn same_names_with_different_ids_never_collide() {
        let first = derive_key(&id("a1"), "Doe", "John", DocumentType::IdProof);
        let second = derive_key(&id("a2"), "Doe", "John", DocumentType::IdProof);
        assert_ne!(first, second);
        assert_eq!(
            first,
            derive_key(&id("a1"), "DOE", "john", DocumentType::IdProof)
        );
    }

    #[test]
    fn keys_live_under_the_folder_prefix() {
        let prefix = folder_prefix(&id("a1"), "Doe", "John");
        for kind in DocumentType::ALL {
            let key = derive_key(&id("a1"), "Doe", "John", kind);
            assert!(key.starts_with(&prefix));
            assert_eq!(file_name(&key), kind.object_name());
        }
    }

    #[test]
    fn document_types_parse_from_wire_names() {
        assert_eq!(
            "proof_of_address".parse::<DocumentType>(),
            Ok(DocumentType::ProofOfAddress)
        );
        assert_eq!(
            "passport".parse::<DocumentType>(),
            Err(UnknownDocumentType("passport".to_string()))
        );
        let json = serde_json::to_string(&DocumentType::BankStatement).expect("serializes");
        assert_eq!(json, "\"bank_statement\"");
    }
}
