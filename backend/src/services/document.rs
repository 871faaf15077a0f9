//! Authorization document generation and storage.
//!
//! Documents are written as `<document_id>.pdf` under the configured
//! directory. A file is first written to a hidden temporary name and then
//! renamed, so readers see either nothing or the complete PDF.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::models::{AbsenceRequest, DocumentReference, OverallStatus, RequestKindTag};
use crate::services::pdf::{self, Certificate, Letterhead, QrMatrix};
use crate::types::RequestId;
use crate::utils::{compact_date, local_date};

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;
const MAX_DOCUMENT_ID_LEN: usize = 64;
const MINT_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("request {0} is not accepted")]
    NotAccepted(RequestId),
    #[error("letterhead asset not found at {0}")]
    MissingLetterhead(PathBuf),
    #[error("letterhead asset is invalid: {0}")]
    InvalidLetterhead(String),
    #[error("QR encoding failed: {0}")]
    Qr(String),
    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("document storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("public base URL cannot carry a path")]
    InvalidBaseUrl,
    #[error("document {0} is not on disk")]
    NotFound(String),
    #[error("no unused document ID after {0} attempts")]
    IdsExhausted(usize),
}

/// Shape check for document IDs: upper-case letters, digits and dashes.
pub fn is_well_formed_document_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_DOCUMENT_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
}

/// `LV-20250304-7QX2`. Four random symbols over 36 characters give about
/// 1.7 million IDs per type per day. Callers check the result against the
/// documents on disk.
pub fn mint_document_id<R: Rng + ?Sized>(
    kind: RequestKindTag,
    issued_on: NaiveDate,
    rng: &mut R,
) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        kind.document_prefix(),
        compact_date(issued_on),
        suffix
    )
}

#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub documents_dir: PathBuf,
    pub letterhead_path: PathBuf,
    pub public_base_url: Url,
    pub time_zone: Tz,
}

impl DocumentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            documents_dir: config.documents_dir.clone(),
            letterhead_path: config.letterhead_path.clone(),
            public_base_url: config.public_base_url.clone(),
            time_zone: config.time_zone,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub reference: DocumentReference,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    settings: DocumentSettings,
}

impl DocumentGenerator {
    pub fn new(settings: DocumentSettings) -> Self {
        Self { settings }
    }

    /// Public URL that confirms a document ID.
    pub fn verification_url(&self, document_id: &str) -> Result<String, DocumentError> {
        let mut url = self.settings.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DocumentError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["api", "verify", document_id]);
        Ok(url.to_string())
    }

    pub fn path_for(&self, document_id: &str) -> PathBuf {
        self.settings
            .documents_dir
            .join(format!("{document_id}.pdf"))
    }

    /// Produce the PDF for an accepted request.
    ///
    /// A request that already carries a document ID keeps it. When its file
    /// is still on disk nothing is rewritten; otherwise the file is rendered
    /// again under the same ID.
    pub async fn generate(
        &self,
        request: &AbsenceRequest,
        now: DateTime<Utc>,
    ) -> Result<GeneratedDocument, DocumentError> {
        if request.status != OverallStatus::Accepted {
            return Err(DocumentError::NotAccepted(request.id));
        }

        if let Some(existing) = &request.document {
            let path = self.path_for(&existing.document_id);
            if tokio::fs::try_exists(&path).await? {
                return Ok(GeneratedDocument {
                    reference: existing.clone(),
                    file_path: path,
                });
            }
        }

        let issued_on = local_date(now, &self.settings.time_zone);
        let (document_id, issued_at) = match &request.document {
            Some(existing) => (existing.document_id.clone(), existing.issued_at),
            None => {
                let kind = request.kind_tag();
                let document_id = self
                    .unused_document_id(|| {
                        mint_document_id(kind, issued_on, &mut rand::thread_rng())
                    })
                    .await?;
                (document_id, now)
            }
        };
        let verification_url = self.verification_url(&document_id)?;

        let letterhead = self.load_letterhead().await?;
        let qr = QrMatrix::encode(&verification_url)?;
        let bytes = pdf::render(
            &Certificate {
                request,
                document_id: &document_id,
                verification_url: &verification_url,
                issued_on: local_date(issued_at, &self.settings.time_zone),
                letterhead: &letterhead,
            },
            &qr,
        )?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        let file_path = self.path_for(&document_id);
        write_atomically(&self.settings.documents_dir, &file_path, &bytes).await?;
        tracing::info!(
            request_id = %request.id,
            document_id = %document_id,
            path = %file_path.display(),
            "authorization document written"
        );

        Ok(GeneratedDocument {
            reference: DocumentReference {
                document_id,
                verification_url,
                sha256,
                issued_at,
            },
            file_path,
        })
    }

    /// Mints until an ID has no file on disk, so a new document never
    /// replaces another request's PDF.
    async fn unused_document_id(
        &self,
        mut mint: impl FnMut() -> String,
    ) -> Result<String, DocumentError> {
        for _ in 0..MINT_ATTEMPTS {
            let candidate = mint();
            if !tokio::fs::try_exists(self.path_for(&candidate)).await? {
                return Ok(candidate);
            }
            tracing::warn!(document_id = %candidate, "minted document ID already on disk");
        }
        Err(DocumentError::IdsExhausted(MINT_ATTEMPTS))
    }

    /// Removes a file whose document ID was never recorded on a request.
    pub async fn discard(&self, document_id: &str) {
        if !is_well_formed_document_id(document_id) {
            return;
        }
        match tokio::fs::remove_file(self.path_for(document_id)).await {
            Ok(()) => tracing::info!(document_id, "unrecorded document removed"),
            Err(err) => {
                tracing::warn!(document_id, error = %err, "unrecorded document left on disk")
            }
        }
    }

    pub async fn exists(&self, document_id: &str) -> bool {
        is_well_formed_document_id(document_id)
            && tokio::fs::try_exists(self.path_for(document_id))
                .await
                .unwrap_or(false)
    }

    pub async fn read(&self, document_id: &str) -> Result<Vec<u8>, DocumentError> {
        if !is_well_formed_document_id(document_id) {
            return Err(DocumentError::NotFound(document_id.to_string()));
        }
        match tokio::fs::read(self.path_for(document_id)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(DocumentError::NotFound(document_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn load_letterhead(&self) -> Result<Letterhead, DocumentError> {
        let path = &self.settings.letterhead_path;
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::MissingLetterhead(path.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&raw).map_err(|err| DocumentError::InvalidLetterhead(err.to_string()))
    }
}

async fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    tokio::fs::create_dir_all(dir).await?;
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf");
    let temp = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = async {
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, target).await
    }
    .await;

    if let Err(err) = result {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewAbsenceRequest, Placement, RequestKind, StageStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    const LETTERHEAD: &str = r#"{"institution": "Test College", "address_lines": ["Road 1"]}"#;

    fn settings(dir: &TempDir) -> DocumentSettings {
        let letterhead_path = dir.path().join("letterhead.json");
        std::fs::write(&letterhead_path, LETTERHEAD).unwrap();
        DocumentSettings {
            documents_dir: dir.path().join("documents"),
            letterhead_path,
            public_base_url: Url::parse("https://passes.example.edu/").unwrap(),
            time_zone: chrono_tz::Asia::Kolkata,
        }
    }

    fn accepted_od() -> AbsenceRequest {
        let mut request = AbsenceRequest::new(
            NewAbsenceRequest {
                student_name: "Arun".into(),
                student_email: "arun@college.edu".into(),
                from: "12 Aug".into(),
                to: "12 Aug".into(),
                subject: "OD".into(),
                content: "Robotics expo".into(),
                kind: RequestKind::Od,
                duration: 1,
                placement: Placement {
                    department: "MECH".into(),
                    year: "4".into(),
                    section: "A".into(),
                },
                attachment: None,
            },
            Utc::now(),
        );
        request.staff_status = StageStatus::Approved;
        request.hod_status = StageStatus::Approved;
        request.status = OverallStatus::Accepted;
        request
    }

    #[test]
    fn minted_ids_follow_prefix_date_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let id = mint_document_id(RequestKindTag::Leave, date, &mut rng);
        assert!(id.starts_with("LV-20250304-"), "{id}");
        assert_eq!(id.len(), "LV-20250304-".len() + SUFFIX_LEN);
        assert!(is_well_formed_document_id(&id));

        let od = mint_document_id(RequestKindTag::Od, date, &mut rng);
        assert!(od.starts_with("OD-20250304-"));
    }

    #[test]
    fn well_formed_check_rejects_lowercase_and_paths() {
        assert!(!is_well_formed_document_id(""));
        assert!(!is_well_formed_document_id("lv-20250304-ab12"));
        assert!(!is_well_formed_document_id("../etc/passwd"));
        assert!(!is_well_formed_document_id(&"A".repeat(65)));
    }

    #[test]
    fn verification_url_appends_fixed_path() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        assert_eq!(
            generator.verification_url("OD-20250812-X1Y2").unwrap(),
            "https://passes.example.edu/api/verify/OD-20250812-X1Y2"
        );
    }

    #[tokio::test]
    async fn generate_writes_pdf_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        let mut request = accepted_od();

        let first = generator.generate(&request, Utc::now()).await.unwrap();
        assert!(first.file_path.exists());
        assert!(first.reference.document_id.starts_with("OD-"));
        let bytes = generator.read(&first.reference.document_id).await.unwrap();
        assert_eq!(hex::encode(Sha256::digest(&bytes)), first.reference.sha256);

        request.document = Some(first.reference.clone());
        let second = generator.generate(&request, Utc::now()).await.unwrap();
        assert_eq!(second.reference, first.reference);

        std::fs::remove_file(&first.file_path).unwrap();
        let regenerated = generator.generate(&request, Utc::now()).await.unwrap();
        assert_eq!(
            regenerated.reference.document_id,
            first.reference.document_id
        );
        assert!(regenerated.file_path.exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("documents"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn minting_skips_ids_already_on_disk() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        std::fs::create_dir_all(dir.path().join("documents")).unwrap();
        std::fs::write(generator.path_for("OD-20250812-AAAA"), b"%PDF taken").unwrap();

        let mut candidates = vec!["OD-20250812-BBBB", "OD-20250812-AAAA"];
        let id = generator
            .unused_document_id(|| candidates.pop().unwrap_or_default().to_string())
            .await
            .unwrap();
        assert_eq!(id, "OD-20250812-BBBB");
        assert_eq!(
            std::fs::read(generator.path_for("OD-20250812-AAAA")).unwrap(),
            b"%PDF taken"
        );

        let result = generator
            .unused_document_id(|| "OD-20250812-AAAA".to_string())
            .await;
        assert!(matches!(result, Err(DocumentError::IdsExhausted(MINT_ATTEMPTS))));
    }

    #[tokio::test]
    async fn discard_removes_only_well_formed_ids() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        let generated = generator.generate(&accepted_od(), Utc::now()).await.unwrap();

        generator.discard("../letterhead").await;
        assert!(dir.path().join("letterhead.json").exists());

        generator.discard(&generated.reference.document_id).await;
        assert!(!generated.file_path.exists());
    }

    #[tokio::test]
    async fn generate_refuses_requests_that_are_not_accepted() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        let mut request = accepted_od();
        request.status = OverallStatus::Pending;
        assert!(matches!(
            generator.generate(&request, Utc::now()).await,
            Err(DocumentError::NotAccepted(_))
        ));
    }

    #[tokio::test]
    async fn missing_letterhead_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        std::fs::remove_file(&settings.letterhead_path).unwrap();
        let documents_dir = settings.documents_dir.clone();
        let generator = DocumentGenerator::new(settings);

        let result = generator.generate(&accepted_od(), Utc::now()).await;
        assert!(matches!(result, Err(DocumentError::MissingLetterhead(_))));
        assert!(!documents_dir.exists());
    }

    #[tokio::test]
    async fn read_rejects_unknown_and_malformed_ids() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(settings(&dir));
        assert!(matches!(
            generator.read("OD-20250101-NONE").await,
            Err(DocumentError::NotFound(_))
        ));
        assert!(matches!(
            generator.read("../secret").await,
            Err(DocumentError::NotFound(_))
        ));
    }
}
