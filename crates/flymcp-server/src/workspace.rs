//! Filesystem resource strategy rooted at the sandbox.
//!
//! Serves the `workspace://` scheme: directory listings with stable
//! ordering and paging, and byte-range file reads. Every path is
//! resolved through the sandbox before it is touched, and sandbox
//! allow/deny rules hide entries from listings the same way they
//! reject reads.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use flymcp_protocol::logging::{debug, targets};
use flymcp_protocol::{
    ListResourcesParams, ListResourcesResult, ReadResourceParams, ReadResourceResult,
    ResourceEntry, ResourceInfo, ServerError, ServerResult,
};

use crate::handler::{BoxFuture, ResourceStrategy};
use crate::sandbox::Sandbox;

/// URI scheme served by [`WorkspaceResources`].
pub const WORKSPACE_SCHEME: &str = "workspace://";

/// Default number of entries per `resources/list` page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Read-only view of the sandboxed project tree.
pub struct WorkspaceResources {
    sandbox: Arc<Sandbox>,
}

impl WorkspaceResources {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    /// Strips the scheme prefix off a URI belonging to this strategy.
    fn relative<'a>(&self, uri: &'a str) -> ServerResult<&'a str> {
        uri.strip_prefix(WORKSPACE_SCHEME)
            .ok_or_else(|| ServerError::invalid_params(format!("unsupported URI: {uri}")))
    }

    /// Resolves a relative URI path through the sandbox.
    ///
    /// Distinguishes a target that simply does not exist from one the
    /// sandbox refuses, so the two map to different error codes.
    fn resolve(&self, uri: &str, rel: &str) -> ServerResult<std::path::PathBuf> {
        if let Some(canonical) = self.sandbox.resolve(rel) {
            if self.sandbox.is_readable(&canonical) {
                return Ok(canonical);
            }
            return Err(ServerError::sandbox_violation(uri));
        }
        if self.sandbox.root().join(rel).exists() {
            return Err(ServerError::sandbox_violation(uri));
        }
        Err(ServerError::resource_not_found(uri))
    }

    /// URI for a canonical path under the sandbox root.
    fn uri_for(&self, canonical: &Path) -> Option<String> {
        let rel = canonical.strip_prefix(self.sandbox.root()).ok()?;
        let mut out = String::from(WORKSPACE_SCHEME);
        for (i, part) in rel.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
        Some(out)
    }

    async fn list_dir(&self, params: &ListResourcesParams) -> ServerResult<ListResourcesResult> {
        let directory = params
            .directory
            .as_deref()
            .unwrap_or(WORKSPACE_SCHEME);
        let rel = self.relative(directory)?;
        let canonical = self.resolve(directory, rel)?;
        if !canonical.is_dir() {
            return Err(ServerError::resource_not_found(directory));
        }

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(&canonical)
            .await
            .map_err(|err| ServerError::internal_error(format!("read_dir failed: {err}")))?;
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| ServerError::internal_error(format!("read_dir failed: {err}")))?
        {
            // Re-resolving each child rejects symlinks that point out
            // of the root, and the readability rules hide denied paths
            // from listings entirely.
            let Some(child) = self.sandbox.resolve(entry.path()) else {
                continue;
            };
            if !self.sandbox.is_readable(&child) {
                continue;
            }
            let Some(uri) = self.uri_for(&child) else {
                continue;
            };
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(target: targets::SANDBOX, "skipping unreadable entry {uri}: {err}");
                    continue;
                }
            };
            entries.push(ResourceEntry {
                uri,
                name: entry.file_name().to_string_lossy().into_owned(),
                directory: metadata.is_dir(),
                size: (!metadata.is_dir()).then(|| metadata.len()),
            });
        }

        // Stable order across calls: lexicographic by URI.
        entries.sort_by(|a, b| a.uri.cmp(&b.uri));

        let total = entries.len();
        let page = params.page.unwrap_or(0);
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let items = entries
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(ListResourcesResult {
            items,
            total,
            page,
            page_size,
        })
    }

    async fn read_file(&self, params: &ReadResourceParams) -> ServerResult<ReadResourceResult> {
        let rel = self.relative(&params.uri)?;
        let canonical = self.resolve(&params.uri, rel)?;
        if canonical.is_dir() {
            return Err(ServerError::resource_not_found(&params.uri));
        }

        let bytes = tokio::fs::read(&canonical)
            .await
            .map_err(|err| ServerError::internal_error(format!("read failed: {err}")))?;
        let total = bytes.len() as u64;

        // Out-of-range slices clamp to an empty tail rather than error.
        let start = params.start.unwrap_or(0).min(total);
        let length = params.length.unwrap_or(total - start).min(total - start);
        let slice = &bytes[start as usize..(start + length) as usize];

        let (content, encoding) = match std::str::from_utf8(slice) {
            Ok(text) => (text.to_owned(), "utf-8"),
            Err(_) => (BASE64.encode(slice), "base64"),
        };

        Ok(ReadResourceResult {
            content,
            encoding: encoding.to_owned(),
            total,
            start,
            length,
        })
    }
}

impl ResourceStrategy for WorkspaceResources {
    fn definition(&self) -> ResourceInfo {
        ResourceInfo {
            scheme: WORKSPACE_SCHEME.to_owned(),
            description: "files under the project root".to_owned(),
            read_only: true,
        }
    }

    fn list<'a>(
        &'a self,
        params: &'a ListResourcesParams,
    ) -> BoxFuture<'a, ServerResult<ListResourcesResult>> {
        Box::pin(self.list_dir(params))
    }

    fn read<'a>(
        &'a self,
        params: &'a ReadResourceParams,
    ) -> BoxFuture<'a, ServerResult<ReadResourceResult>> {
        Box::pin(self.read_file(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flymcp_protocol::ErrorCode;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, WorkspaceResources) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pubspec.yaml"), "name: demo\n").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/main.dart"), "void main() {}\n").unwrap();
        fs::write(dir.path().join("lib/app.dart"), "class App {}\n").unwrap();
        fs::create_dir(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/out.bin"), [0u8, 159, 146, 150]).unwrap();
        let sandbox =
            Sandbox::new(dir.path(), &[], &["build/**".to_owned(), "build".to_owned()]).unwrap();
        let workspace = WorkspaceResources::new(Arc::new(sandbox));
        (dir, workspace)
    }

    fn list_params(directory: Option<&str>, page: usize, page_size: usize) -> ListResourcesParams {
        ListResourcesParams {
            directory: directory.map(str::to_owned),
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    #[tokio::test]
    async fn listing_is_sorted_and_hides_denied_entries() {
        let (_dir, workspace) = fixture();
        let result = workspace
            .list_dir(&ListResourcesParams::default())
            .await
            .unwrap();

        let uris: Vec<&str> = result.items.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, ["workspace://lib", "workspace://pubspec.yaml"]);
        assert_eq!(result.total, 2);
        assert!(result.items[0].directory);
        assert_eq!(result.items[0].size, None);
        assert!(result.items[1].size.is_some());
    }

    #[tokio::test]
    async fn paging_concatenates_to_the_full_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.dart", "b.dart", "c.dart", "d.dart", "e.dart"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let sandbox = Sandbox::new(dir.path(), &[], &[]).unwrap();
        let workspace = WorkspaceResources::new(Arc::new(sandbox));

        let full = workspace
            .list_dir(&list_params(None, 0, 100))
            .await
            .unwrap();
        assert_eq!(full.total, 5);

        // pageSize 2 over 5 entries is 3 pages whose concatenation is
        // exactly the full listing.
        let mut paged = Vec::new();
        for page in 0..3 {
            let result = workspace.list_dir(&list_params(None, page, 2)).await.unwrap();
            assert_eq!(result.total, 5);
            assert_eq!(result.page, page);
            paged.extend(result.items);
        }
        assert_eq!(paged, full.items);

        // An unchanged directory lists identically across calls.
        let again = workspace
            .list_dir(&list_params(None, 0, 100))
            .await
            .unwrap();
        assert_eq!(again.items, full.items);
    }

    #[tokio::test]
    async fn listing_outside_root_is_a_sandbox_violation() {
        let (_dir, workspace) = fixture();
        let err = workspace
            .list_dir(&list_params(Some("workspace://../"), 0, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let (_dir, workspace) = fixture();
        let err = workspace
            .list_dir(&list_params(Some("workspace://nope"), 0, 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
    }

    #[tokio::test]
    async fn read_returns_utf8_text() {
        let (_dir, workspace) = fixture();
        let result = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://lib/main.dart".to_owned(),
                start: None,
                length: None,
            })
            .await
            .unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.content, "void main() {}\n");
        assert_eq!(result.total, 15);
        assert_eq!(result.length, 15);
    }

    #[tokio::test]
    async fn read_honors_byte_ranges_and_clamps() {
        let (_dir, workspace) = fixture();
        let result = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://lib/main.dart".to_owned(),
                start: Some(5),
                length: Some(4),
            })
            .await
            .unwrap();
        assert_eq!(result.content, "main");
        assert_eq!(result.start, 5);
        assert_eq!(result.length, 4);

        let clamped = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://lib/main.dart".to_owned(),
                start: Some(1000),
                length: Some(10),
            })
            .await
            .unwrap();
        assert_eq!(clamped.start, 15);
        assert_eq!(clamped.length, 0);
        assert_eq!(clamped.content, "");
    }

    #[tokio::test]
    async fn non_utf8_content_comes_back_base64() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
        let sandbox = Sandbox::new(dir.path(), &[], &[]).unwrap();
        let workspace = WorkspaceResources::new(Arc::new(sandbox));

        let result = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://blob.bin".to_owned(),
                start: None,
                length: None,
            })
            .await
            .unwrap();
        assert_eq!(result.encoding, "base64");
        assert_eq!(
            BASE64.decode(result.content).unwrap(),
            [0u8, 159, 146, 150]
        );
    }

    #[tokio::test]
    async fn denied_file_read_is_a_sandbox_violation() {
        let (_dir, workspace) = fixture();
        let err = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://build/out.bin".to_owned(),
                start: None,
                length: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SandboxViolation);
    }

    #[tokio::test]
    async fn reading_a_directory_is_not_found() {
        let (_dir, workspace) = fixture();
        let err = workspace
            .read_file(&ReadResourceParams {
                uri: "workspace://lib".to_owned(),
                start: None,
                length: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
    }
}
