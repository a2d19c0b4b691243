//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json` and
//! browsed through Swagger UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    AddRequest, AddResponse, CheckRequest, CheckResponse, ClearResponse, DeleteResponse,
    EmbedResponse, EntryResponse, ExtractResponse, HealthResponse, ListEntriesResponse,
    MetadataPatch, ReadyResponse,
};

/// Registers the bearer scheme used by the admin routes.
struct AdminTokenAddon;

impl Modify for AdminTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Imprint API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Imprint API",
        version = "0.1.0",
        description = r#"
## Content Fingerprint & Invisible Watermark API

Imprint detects exact and near-duplicate images and ties them to ownership
and licensing metadata:

- **Exact digests** - SHA-256 over the raw bytes
- **Perceptual fingerprints** - 64-bit luminance hash compared by Hamming distance
- **Invisible watermarks** - a JSON ownership payload hidden in pixel data
- **Registry** - digest-keyed records with licensing terms and match statistics

### Typical flow

1. Watermark the original via `POST /watermark/embed`
2. Register the circulating image via `POST /add`
3. Before accepting a new upload, call `POST /check` (or `/check/image`) and
   `POST /watermark/extract` with the uploader as `claimant`
4. A match with `derivativesAllowed: null` needs manual review
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers((url = "http://localhost:3000", description = "Local development server")),
    tags(
        (name = "Matching", description = "Exact and perceptual duplicate checks"),
        (name = "Registry", description = "Register assets and update their metadata"),
        (name = "Watermark", description = "Embed and extract invisible ownership marks"),
        (name = "Admin", description = "Registry administration (bearer token)"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::check::check_handler,
        crate::handlers::check::check_image_handler,
        crate::handlers::add::add_handler,
        crate::handlers::entries::update_entry_handler,
        crate::handlers::watermark::embed_handler,
        crate::handlers::watermark::extract_handler,
        crate::handlers::admin::list_entries_handler,
        crate::handlers::admin::clear_entries_handler,
        crate::handlers::admin::delete_entry_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            CheckRequest,
            CheckResponse,
            AddRequest,
            AddResponse,
            MetadataPatch,
            EntryResponse,
            EmbedResponse,
            ExtractResponse,
            ListEntriesResponse,
            ClearResponse,
            DeleteResponse,
        )
    ),
    modifiers(&AdminTokenAddon)
)]
pub struct ApiDoc;
