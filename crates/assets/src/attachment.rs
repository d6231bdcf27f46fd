//! Invoice attachment metadata and the policy applied when it is invalid.
//!
//! Only the metadata of an uploaded invoice (file name + MIME type) is modelled
//! here. Whether a bad attachment sinks the whole equipment write or is silently
//! dropped is a deployment choice, see [`InvoiceAttachmentPolicy`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, EquipmentId};

const ALLOWED: [(&str, &str); 5] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
];

/// Attachment metadata as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAttachment {
    pub file_name: String,
    /// Optional; inferred from the extension when absent.
    #[serde(default)]
    pub mime: Option<String>,
}

/// An attachment that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAttachment {
    pub extension: &'static str,
    pub mime: &'static str,
}

impl ValidAttachment {
    /// Name under which the file is stored for a given equipment: `nf_<id>.<ext>`.
    pub fn stored_file_name(&self, equipment_id: EquipmentId) -> String {
        format!("nf_{}.{}", equipment_id, self.extension)
    }
}

impl InvoiceAttachment {
    pub fn validate(&self) -> DomainResult<ValidAttachment> {
        let file_name = self.file_name.trim();
        let extension = file_name
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext)
            .ok_or_else(|| {
                DomainError::validation(format!("invoice file '{file_name}' has no extension"))
            })?;

        let (ext, mime) = ALLOWED
            .iter()
            .find(|(allowed, _)| *allowed == extension)
            .copied()
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invoice file type '.{extension}' is not allowed (jpg, jpeg, png, webp, pdf)"
                ))
            })?;

        if let Some(declared) = self.mime.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            if !declared.eq_ignore_ascii_case(mime) {
                return Err(DomainError::validation(format!(
                    "invoice MIME type '{declared}' does not match '.{ext}'"
                )));
            }
        }

        Ok(ValidAttachment {
            extension: ext,
            mime,
        })
    }
}

/// What to do with an attachment that fails validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceAttachmentPolicy {
    /// Keep the equipment, drop the attachment.
    #[default]
    Lenient,
    /// Reject the whole write.
    Strict,
}

/// Result of applying the policy to an (optional) attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentDecision {
    /// No attachment was supplied.
    Absent,
    Attach(ValidAttachment),
    /// Lenient policy dropped an invalid attachment; carries the reason.
    Dropped(String),
}

impl InvoiceAttachmentPolicy {
    pub fn decide(self, attachment: Option<&InvoiceAttachment>) -> DomainResult<AttachmentDecision> {
        let Some(attachment) = attachment else {
            return Ok(AttachmentDecision::Absent);
        };

        match (attachment.validate(), self) {
            (Ok(valid), _) => Ok(AttachmentDecision::Attach(valid)),
            (Err(err), InvoiceAttachmentPolicy::Strict) => Err(err),
            (Err(err), InvoiceAttachmentPolicy::Lenient) => {
                Ok(AttachmentDecision::Dropped(err.to_string()))
            }
        }
    }
}

impl FromStr for InvoiceAttachmentPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(DomainError::validation(format!(
                "unknown invoice attachment policy '{other}' (lenient, strict)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, mime: Option<&str>) -> InvoiceAttachment {
        InvoiceAttachment {
            file_name: name.to_string(),
            mime: mime.map(str::to_string),
        }
    }

    #[test]
    fn accepts_images_and_pdf() {
        let v = attachment("NF 123.PDF", None).validate().unwrap();
        assert_eq!(v.extension, "pdf");
        assert_eq!(v.mime, "application/pdf");
        assert_eq!(v.stored_file_name(EquipmentId::from_i64(12)), "nf_12.pdf");

        let v = attachment("foto.jpeg", Some("image/jpeg")).validate().unwrap();
        assert_eq!(v.stored_file_name(EquipmentId::from_i64(3)), "nf_3.jpeg");
    }

    #[test]
    fn rejects_unknown_extension_and_mime_mismatch() {
        assert!(attachment("planilha.xlsx", None).validate().is_err());
        assert!(attachment("semextensao", None).validate().is_err());
        assert!(attachment(".pdf", None).validate().is_err());
        assert!(attachment("nota.pdf", Some("image/png")).validate().is_err());
    }

    #[test]
    fn lenient_policy_drops_invalid_attachment() {
        let bad = attachment("virus.exe", None);
        let decision = InvoiceAttachmentPolicy::Lenient.decide(Some(&bad)).unwrap();
        assert!(matches!(decision, AttachmentDecision::Dropped(reason) if reason.contains(".exe")));
    }

    #[test]
    fn strict_policy_rejects_invalid_attachment() {
        let bad = attachment("virus.exe", None);
        assert!(matches!(
            InvoiceAttachmentPolicy::Strict.decide(Some(&bad)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn absent_attachment_is_fine_under_both_policies() {
        for policy in [InvoiceAttachmentPolicy::Lenient, InvoiceAttachmentPolicy::Strict] {
            assert_eq!(policy.decide(None).unwrap(), AttachmentDecision::Absent);
        }
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("STRICT".parse::<InvoiceAttachmentPolicy>().unwrap(), InvoiceAttachmentPolicy::Strict);
        assert_eq!(" lenient".parse::<InvoiceAttachmentPolicy>().unwrap(), InvoiceAttachmentPolicy::Lenient);
        assert!("maybe".parse::<InvoiceAttachmentPolicy>().is_err());
    }
}
