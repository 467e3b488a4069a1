//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Source of fallback copies for imports a project does not provide itself.
///
/// Lookups are keyed by the import path exactly as written in the schema.
pub trait FallbackSchemas {
    /// Content for `import_path`, if this source carries it.
    fn lookup(&self, import_path: &str) -> Option<Cow<'_, str>>;
}

macro_rules! bundled {
    ($($path:literal),+ $(,)?) => {
        &[$(($path, include_str!(concat!("../resources/", $path)))),+]
    };
}

static WELL_KNOWN: &[(&str, &str)] = bundled![
    "google/protobuf/any.proto",
    "google/protobuf/duration.proto",
    "google/protobuf/empty.proto",
    "google/protobuf/field_mask.proto",
    "google/protobuf/source_context.proto",
    "google/protobuf/struct.proto",
    "google/protobuf/timestamp.proto",
    "google/protobuf/type.proto",
    "google/protobuf/wrappers.proto",
];

/// Well-known types compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSchemas;

impl BundledSchemas {
    /// Import paths available from the bundle.
    pub fn paths(&self) -> impl Iterator<Item = &'static str> {
        WELL_KNOWN.iter().map(|(path, _)| *path)
    }
}

impl FallbackSchemas for BundledSchemas {
    fn lookup(&self, import_path: &str) -> Option<Cow<'_, str>> {
        WELL_KNOWN
            .iter()
            .find(|(path, _)| *path == import_path)
            .map(|(_, content)| Cow::Borrowed(*content))
    }
}

impl FallbackSchemas for HashMap<String, String> {
    fn lookup(&self, import_path: &str) -> Option<Cow<'_, str>> {
        self.get(import_path).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl FallbackSchemas for BTreeMap<String, String> {
    fn lookup(&self, import_path: &str) -> Option<Cow<'_, str>> {
        self.get(import_path).map(|s| Cow::Borrowed(s.as_str()))
    }
}
