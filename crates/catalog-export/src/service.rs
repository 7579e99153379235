//! Offline export pipeline (§4.6).
//!
//! # Design
//!
//! Export runs in three steps: select + expand the bundle closure over a
//! full store snapshot (categories first, per §4.6), render the two member
//! files (`metadata.txt`, `package.xml`), then pack both into a zip cabinet.
//! The closure itself is delegated to `catalog-query` so the member-before-
//! parent ordering invariant lives in one place.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use catalog_config::ServiceConfig;
use catalog_core::file::UpdateFile;
use catalog_core::update::Update;
use catalog_query::{Filter, expand_bundle_closure, select};
use catalog_store::MetadataStore;
use catalog_telemetry::Metrics;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};
use crate::model::ExportRequest;

/// Builds the legacy offline-import archive from a metadata store snapshot.
pub struct ExportService {
    store: Arc<dyn MetadataStore>,
    telemetry: Option<Metrics>,
}

impl ExportService {
    /// Construct an export service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            telemetry: None,
        }
    }

    /// Attach a metrics handle; each `export` call then records one
    /// `export_steps_total{step="export",status=..}` observation.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Metrics) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Produce the export archive bytes for `request`, under `config`'s
    /// language list and export version strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store snapshot fails, a selected update has
    /// no recorded canonical XML, or the archive cannot be written.
    pub async fn export(
        &self,
        config: &ServiceConfig,
        request: &ExportRequest,
    ) -> ExportResult<Vec<u8>> {
        let result = self.export_inner(config, request).await;
        if let Some(telemetry) = &self.telemetry {
            telemetry.inc_export_step("export", if result.is_ok() { "completed" } else { "failed" });
        }
        result
    }

    async fn export_inner(
        &self,
        config: &ServiceConfig,
        request: &ExportRequest,
    ) -> ExportResult<Vec<u8>> {
        let snapshot = self.store.snapshot().await.map_err(|source| ExportError::Store {
            operation: "snapshot",
            source,
        })?;

        let ordered = select_closure(&snapshot, &request.filter, request.first_x);
        let metadata = self.render_metadata(&ordered).await?;
        let package_xml = render_package_xml(config, &ordered);

        pack(&metadata, &package_xml)
    }

    async fn render_metadata(&self, ordered: &[&Update]) -> ExportResult<String> {
        let mut out = String::new();
        for update in ordered {
            let identity = update.identity();
            let xml = self
                .store
                .get_xml(identity)
                .await
                .map_err(|source| ExportError::Store {
                    operation: "get_xml",
                    source,
                })?
                .ok_or(ExportError::MissingXml { identity })?;
            out.push_str(&format!(
                "{},{:08x},{:08x},{xml}\r\n",
                identity.id,
                identity.revision,
                xml.len()
            ));
        }
        Ok(out)
    }
}

/// Select, cap, and expand the closure, returning categories before every
/// other update (§4.6: "categories first").
fn select_closure<'a>(snapshot: &'a [Update], filter: &Filter, first_x: Option<usize>) -> Vec<&'a Update> {
    // Category updates carry no product/classification ids, so `select` never
    // returns them; every category in the snapshot is always exported.
    let categories: Vec<&Update> = snapshot.iter().filter(|update| update.is_category()).collect();

    let mut rest: Vec<&Update> = select(snapshot, filter)
        .into_iter()
        .filter(|update| !update.is_category())
        .collect();
    if let Some(limit) = first_x {
        rest.truncate(limit);
    }

    let mut seed = categories;
    seed.extend(rest);

    let closure = expand_bundle_closure(snapshot, seed);
    let (mut categories, mut updates): (Vec<&Update>, Vec<&Update>) =
        closure.into_iter().partition(|update| update.is_category());
    categories.append(&mut updates);
    categories
}

fn render_package_xml(config: &ServiceConfig, ordered: &[&Update]) -> String {
    let server_id = Uuid::new_v4();
    let creation_time = Utc::now().to_rfc3339();

    let mut files: Vec<&UpdateFile> = Vec::new();
    let mut seen_digests: HashSet<Vec<u8>> = HashSet::new();
    for update in ordered {
        for file in update.files().unwrap_or_default() {
            if let Some(digest) = file.strongest_digest() {
                if seen_digests.insert(digest.bytes.clone()) {
                    files.push(file);
                }
            }
        }
    }

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\"?>\n");
    xml.push_str(&format!(
        "<ExportPackage ServerID=\"{server_id}\" CreationTime=\"{creation_time}\" FormatVersion=\"{}\" ProtocolVersion=\"{}\">\n",
        escape_attr(&config.export_format_version),
        escape_attr(&config.export_protocol_version),
    ));

    xml.push_str("  <Languages>\n");
    for language in &config.languages {
        xml.push_str(&format!("    <Language Name=\"{}\" />\n", escape_attr(language)));
    }
    xml.push_str("  </Languages>\n");

    xml.push_str("  <Files>\n");
    for file in &files {
        let digest = file.strongest_digest().expect("filtered to files carrying a digest above");
        xml.push_str(&format!(
            "    <File FileName=\"{}\" Size=\"{}\" Digest=\"{}\" />\n",
            escape_attr(&file.file_name),
            file.size,
            hex_encode(&digest.bytes),
        ));
    }
    xml.push_str("  </Files>\n");

    xml.push_str("  <Updates>\n");
    for update in ordered {
        let identity = update.identity();
        xml.push_str(&format!(
            "    <Update UpdateID=\"{}\" RevisionNumber=\"{}\">\n",
            identity.id, identity.revision
        ));
        for product_id in update.product_ids().unwrap_or_default() {
            xml.push_str(&format!("      <Product CategoryID=\"{product_id}\" />\n"));
        }
        for classification_id in update.classification_ids().unwrap_or_default() {
            xml.push_str(&format!(
                "      <Classification CategoryID=\"{classification_id}\" />\n"
            ));
        }
        for file in update.files().unwrap_or_default() {
            if let Some(digest) = file.strongest_digest() {
                xml.push_str(&format!("      <FileRef Digest=\"{}\" />\n", hex_encode(&digest.bytes)));
            }
        }
        xml.push_str("    </Update>\n");
    }
    xml.push_str("  </Updates>\n");
    xml.push_str("</ExportPackage>\n");
    xml
}

fn pack(metadata: &str, package_xml: &str) -> ExportResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let cursor = Cursor::new(&mut buffer);
    let mut writer = zip::ZipWriter::new(cursor);
    let options = zip::write::FileOptions::default();

    writer
        .start_file("metadata.txt", options)
        .map_err(|source| ExportError::Zip {
            operation: "start_file.metadata",
            source,
        })?;
    writer.write_all(metadata.as_bytes()).map_err(|source| ExportError::Io {
        operation: "write.metadata",
        source,
    })?;

    writer
        .start_file("package.xml", options)
        .map_err(|source| ExportError::Zip {
            operation: "start_file.package_xml",
            source,
        })?;
    writer.write_all(package_xml.as_bytes()).map_err(|source| ExportError::Io {
        operation: "write.package_xml",
        source,
    })?;

    writer.finish().map_err(|source| ExportError::Zip {
        operation: "finish",
        source,
    })?;
    drop(writer);
    Ok(buffer)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::file::{DigestAlgorithm, FileDigest};
    use catalog_core::identity::PackageIdentity;
    use catalog_core::prerequisite::Prerequisite;
    use catalog_core::update::{SoftwareUpdateData, UpdateHeader};
    use catalog_store::InMemoryMetadataStore;
    use uuid::Uuid;

    fn header(n: u128, title: &str) -> UpdateHeader {
        UpdateHeader {
            identity: PackageIdentity::new(Uuid::from_u128(n), 1),
            title: title.to_string(),
            description: None,
        }
    }

    fn classification(n: u128) -> Update {
        Update::Classification { header: header(n, "Critical Updates") }
    }

    fn software(n: u128, title: &str, classification_id: Uuid, members: Vec<PackageIdentity>) -> Update {
        Update::SoftwareUpdate {
            header: header(n, title),
            data: SoftwareUpdateData {
                files: vec![UpdateFile {
                    file_name: format!("{title}.cab"),
                    size: 100,
                    source_url: "https://example.invalid/payload.cab".to_string(),
                    digests: vec![FileDigest {
                        algorithm: DigestAlgorithm::Sha256,
                        bytes: vec![n as u8; 32],
                    }],
                }],
                prerequisites: Vec::<Prerequisite>::new(),
                superseded: Vec::new(),
                bundled_with: Vec::new(),
                bundled_members: members,
                kb_article_id: None,
                support_url: None,
                os_upgrade: false,
                product_ids: Vec::new(),
                classification_ids: vec![classification_id],
            },
        }
    }

    async fn seeded_store() -> (Arc<InMemoryMetadataStore>, Uuid) {
        let store = Arc::new(InMemoryMetadataStore::new());
        let classification_id = Uuid::from_u128(900);

        let member = software(1, "member", classification_id, Vec::new());
        let parent = software(
            2,
            "parent",
            classification_id,
            vec![member.identity()],
        );
        let category = classification(900);

        for update in [&category, &member, &parent] {
            let xml = format!("<Update><UpdateIdentity UpdateID=\"{}\" /></Update>", update.identity().id);
            store.put(update, &xml).await.expect("put");
        }

        (store, classification_id)
    }

    #[tokio::test]
    async fn export_orders_categories_before_updates_and_members_before_parents() {
        let (store, classification_id) = seeded_store().await;
        let service = ExportService::new(store);
        let request = ExportRequest {
            filter: Filter {
                classification_ids: vec![classification_id],
                ..Filter::default()
            },
            first_x: None,
        };

        let archive = service
            .export(&ServiceConfig::default(), &request)
            .await
            .expect("export succeeds");

        assert!(!archive.is_empty());

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip");
        let mut metadata = String::new();
        std::io::Read::read_to_string(&mut zip.by_name("metadata.txt").expect("metadata entry"), &mut metadata)
            .expect("read metadata");

        let lines: Vec<&str> = metadata.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("<Update>")); // category line first
        let member_line = lines.iter().position(|line| line.contains("member")).expect("member present");
        let parent_line = lines.iter().position(|line| line.contains("parent")).expect("parent present");
        assert!(member_line < parent_line);
    }

    #[tokio::test]
    async fn export_package_xml_lists_each_file_once() {
        let (store, classification_id) = seeded_store().await;
        let service = ExportService::new(store);
        let request = ExportRequest {
            filter: Filter {
                classification_ids: vec![classification_id],
                ..Filter::default()
            },
            first_x: None,
        };

        let archive = service
            .export(&ServiceConfig::default(), &request)
            .await
            .expect("export succeeds");
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip");
        let mut package_xml = String::new();
        std::io::Read::read_to_string(
            &mut zip.by_name("package.xml").expect("package.xml entry"),
            &mut package_xml,
        )
        .expect("read package.xml");

        assert!(package_xml.contains("<ExportPackage"));
        assert_eq!(package_xml.matches("<File ").count(), 2);
    }

    #[tokio::test]
    async fn export_caps_non_category_updates_via_first_x() {
        let store = Arc::new(InMemoryMetadataStore::new());
        let classification_id = Uuid::from_u128(901);
        for n in 10..15u128 {
            let update = software(n, &format!("update-{n}"), classification_id, Vec::new());
            let xml = format!("<Update><UpdateIdentity UpdateID=\"{}\" /></Update>", update.identity().id);
            store.put(&update, &xml).await.expect("put");
        }
        let category = classification(901);
        let xml = format!("<Update><UpdateIdentity UpdateID=\"{}\" /></Update>", category.identity().id);
        store.put(&category, &xml).await.expect("put");

        let service = ExportService::new(store);
        let request = ExportRequest {
            filter: Filter {
                classification_ids: vec![classification_id],
                ..Filter::default()
            },
            first_x: Some(2),
        };
        let archive = service
            .export(&ServiceConfig::default(), &request)
            .await
            .expect("export succeeds");
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip");
        let mut metadata = String::new();
        std::io::Read::read_to_string(&mut zip.by_name("metadata.txt").expect("metadata entry"), &mut metadata)
            .expect("read metadata");

        // one category line plus the capped two software update lines
        assert_eq!(metadata.lines().count(), 3);
    }

    #[tokio::test]
    async fn export_records_a_completed_step_on_the_attached_metrics() {
        let (store, classification_id) = seeded_store().await;
        let telemetry = Metrics::new().expect("telemetry");
        let service = ExportService::new(store).with_telemetry(telemetry.clone());
        let request = ExportRequest {
            filter: Filter {
                classification_ids: vec![classification_id],
                ..Filter::default()
            },
            first_x: None,
        };
        service
            .export(&ServiceConfig::default(), &request)
            .await
            .expect("export succeeds");

        let rendered = telemetry.render().expect("render");
        assert!(rendered.contains(r#"export_steps_total{status="completed",step="export"} 1"#));
    }
}
