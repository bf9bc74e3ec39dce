use thiserror::Error;
use tracing::{debug, warn};

use room_archive_net::Session;
use room_archive_shared::crypto::decrypt_attachment;
use room_archive_shared::{sanitize_component, ContentUri, CryptoError, MediaReference};

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to decrypt {uri}: {source}")]
    Decrypt {
        uri: String,
        #[source]
        source: CryptoError,
    },
}

/// Bytes ready to be written, with the name they should be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub decrypted: bool,
}

/// Resolves content pointers through the session's download call.
pub struct MediaResolver<'a> {
    session: &'a dyn Session,
}

impl<'a> MediaResolver<'a> {
    pub fn new(session: &'a dyn Session) -> Self {
        Self { session }
    }

    /// Download and, when unlock material is present, decrypt an attachment.
    ///
    /// A failed or empty download yields zero bytes and is only logged, so
    /// the record still reaches the archive. A decryption failure is returned
    /// and the caller drops the event.
    pub async fn resolve(&self, reference: &MediaReference, body: &str) -> Result<ResolvedMedia, MediaError> {
        let uri = reference.uri();
        let file_name = suggested_file_name(body, uri);
        let downloaded = self.fetch(uri).await;

        match reference {
            MediaReference::Encrypted { unlock, .. } if !downloaded.is_empty() => {
                let bytes = decrypt_attachment(&downloaded, unlock).map_err(|source| MediaError::Decrypt {
                    uri: uri.to_string(),
                    source,
                })?;
                debug!(%uri, size = bytes.len(), "Decrypted attachment");
                Ok(ResolvedMedia {
                    bytes,
                    file_name,
                    decrypted: true,
                })
            }
            _ => Ok(ResolvedMedia {
                bytes: downloaded,
                file_name,
                decrypted: false,
            }),
        }
    }

    /// Avatars are never encrypted.
    pub async fn resolve_avatar(&self, uri: &ContentUri) -> Vec<u8> {
        self.fetch(uri).await
    }

    async fn fetch(&self, uri: &ContentUri) -> Vec<u8> {
        match self.session.download(uri).await {
            Ok(bytes) => {
                if bytes.is_empty() {
                    warn!(%uri, "Download returned no content");
                }
                bytes
            }
            Err(e) => {
                warn!(%uri, error = %e, "Download failed, storing empty file");
                Vec::new()
            }
        }
    }
}

/// Name an attachment after its message body, falling back to the media id.
pub fn suggested_file_name(body: &str, uri: &ContentUri) -> String {
    sanitize_component(body, uri.media_id())
}

#[cfg(test)]
mod tests {
    use room_archive_net::MemorySession;
    use room_archive_shared::crypto::encrypt_attachment;

    use super::*;

    fn uri(id: &str) -> ContentUri {
        format!("mxc://example.org/{id}").parse().unwrap()
    }

    #[tokio::test]
    async fn test_encrypted_attachment_decrypted() {
        let plaintext = b"\x89PNG fake image bytes".to_vec();
        let (ciphertext, unlock) = encrypt_attachment(&plaintext);
        let session = MemorySession::new().with_media(uri("enc"), ciphertext);
        let resolver = MediaResolver::new(&session);

        let reference = MediaReference::Encrypted {
            uri: uri("enc"),
            unlock,
        };
        let media = resolver.resolve(&reference, "cat.png").await.unwrap();

        assert_eq!(media.bytes, plaintext);
        assert_eq!(media.file_name, "cat.png");
        assert!(media.decrypted);
    }

    #[tokio::test]
    async fn test_plaintext_passes_through() {
        let raw = b"plain bytes".to_vec();
        let session = MemorySession::new().with_media(uri("plain"), raw.clone());
        let resolver = MediaResolver::new(&session);

        let reference = MediaReference::Plaintext { uri: uri("plain") };
        let media = resolver.resolve(&reference, "notes.txt").await.unwrap();

        assert_eq!(media.bytes, raw);
        assert!(!media.decrypted);
    }

    #[tokio::test]
    async fn test_hash_mismatch_is_error() {
        let (mut ciphertext, unlock) = encrypt_attachment(b"secret");
        ciphertext[0] ^= 0x01;
        let session = MemorySession::new().with_media(uri("bad"), ciphertext);
        let resolver = MediaResolver::new(&session);

        let reference = MediaReference::Encrypted {
            uri: uri("bad"),
            unlock,
        };
        let err = resolver.resolve(&reference, "x.bin").await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::Decrypt {
                source: CryptoError::HashMismatch,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_download_is_empty() {
        let session = MemorySession::new();
        let resolver = MediaResolver::new(&session);

        let (_, unlock) = encrypt_attachment(b"never uploaded");
        let reference = MediaReference::Encrypted {
            uri: uri("missing"),
            unlock,
        };
        let media = resolver.resolve(&reference, "").await.unwrap();

        assert!(media.bytes.is_empty());
        assert_eq!(media.file_name, "missing");
        assert_eq!(session.downloads(), vec![uri("missing")]);
    }

    #[tokio::test]
    async fn test_avatar_is_raw() {
        let session = MemorySession::new().with_media(uri("face"), vec![1, 2, 3]);
        let resolver = MediaResolver::new(&session);
        assert_eq!(resolver.resolve_avatar(&uri("face")).await, vec![1, 2, 3]);
    }

    #[test]
    fn test_suggested_name_is_safe() {
        assert_eq!(suggested_file_name("../x.png", &uri("m")), "___x.png");
    }
}
