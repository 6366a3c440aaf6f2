//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec, served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
///
/// Registers all utoipa-documented routes, schemas, and tags. Serves as the
/// single source of truth for integrators.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AgroSuelo API — Administrative Backend",
        version = "0.3.7",
        description = "Administrative backend for the soil-resource management program.\n\nProvides:\n- **Role and interface directories** with soft deactivation\n- **Capability matrix** — dense role × interface projection and batch reconciliation with per-role merge modes (add/update/replace)\n- **Name-resolution adapter** for single-pair grant operations keyed by names\n- **Reference geography** (countries, departments, municipalities)\n- **Soil-chemistry element catalog**\n- **Land parcel registry** with resolved geography\n- **Soil analysis log** with per-element readings\n\nHealth probes (`/health/*`) and `/metrics` sit outside the `/v1` prefix.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Permission matrix ────────────────────────────────────────────
        crate::routes::matrix::dense_matrix,
        crate::routes::matrix::dense_matrix_by_role,
        crate::routes::matrix::reconcile_batch,
        crate::routes::matrix::get_pair_by_name,
        crate::routes::matrix::upsert_pair_by_name,
        crate::routes::matrix::create_pair_by_name,
        crate::routes::matrix::delete_pair_by_name,
        // ── Role directory ───────────────────────────────────────────────
        crate::routes::roles::create_role,
        crate::routes::roles::list_roles,
        crate::routes::roles::get_role,
        crate::routes::roles::update_role,
        crate::routes::roles::deactivate_role,
        crate::routes::roles::reactivate_role,
        // ── Interface directory ──────────────────────────────────────────
        crate::routes::interfaces::create_interface,
        crate::routes::interfaces::list_interfaces,
        crate::routes::interfaces::get_interface,
        crate::routes::interfaces::update_interface,
        crate::routes::interfaces::deactivate_interface,
        crate::routes::interfaces::reactivate_interface,
        // ── Reference geography ──────────────────────────────────────────
        crate::routes::geography::create_country,
        crate::routes::geography::list_countries,
        crate::routes::geography::get_country,
        crate::routes::geography::update_country,
        crate::routes::geography::deactivate_country,
        crate::routes::geography::create_department,
        crate::routes::geography::list_departments,
        crate::routes::geography::update_department,
        crate::routes::geography::deactivate_department,
        crate::routes::geography::create_municipality,
        crate::routes::geography::list_municipalities,
        crate::routes::geography::update_municipality,
        crate::routes::geography::deactivate_municipality,
        // ── Element catalog ──────────────────────────────────────────────
        crate::routes::elements::create_element,
        crate::routes::elements::list_elements,
        crate::routes::elements::get_element,
        crate::routes::elements::update_element,
        crate::routes::elements::deactivate_element,
        // ── Land parcel registry ─────────────────────────────────────────
        crate::routes::parcels::create_parcel,
        crate::routes::parcels::list_parcels,
        crate::routes::parcels::get_parcel,
        crate::routes::parcels::update_parcel,
        crate::routes::parcels::deactivate_parcel,
        // ── Soil analysis log ────────────────────────────────────────────
        crate::routes::analyses::create_analysis,
        crate::routes::analyses::list_analyses,
        crate::routes::analyses::get_analysis,
        crate::routes::analyses::add_measurement,
        crate::routes::analyses::deactivate_analysis,
    ),
    components(
        schemas(
            // ── Domain records ──────────────────────────────────────────
            crate::state::Role,
            crate::state::Interface,
            crate::state::Country,
            crate::state::Department,
            crate::state::Municipality,
            crate::state::ChemicalElement,
            crate::state::LandParcel,
            crate::state::SoilAnalysis,
            crate::state::AnalysisMeasurement,
            // ── Matrix types ────────────────────────────────────────────
            crate::matrix::CapabilityFlags,
            crate::matrix::merge::MergeMode,
            crate::matrix::reconcile::RoleRef,
            crate::matrix::reconcile::EntrySubmission,
            crate::matrix::reconcile::RoleSubmission,
            crate::matrix::project::RoleLite,
            crate::matrix::project::InterfaceGrant,
            crate::matrix::project::RoleRow,
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Request DTOs ────────────────────────────────────────────
            crate::routes::matrix::PairResponse,
            crate::routes::matrix::PairMutationRequest,
            crate::routes::roles::CreateRoleRequest,
            crate::routes::roles::UpdateRoleRequest,
            crate::routes::interfaces::InterfaceRequest,
            crate::routes::geography::CountryRequest,
            crate::routes::geography::CreateDepartmentRequest,
            crate::routes::geography::CreateMunicipalityRequest,
            crate::routes::geography::RenameRequest,
            crate::routes::elements::ElementRequest,
            crate::routes::parcels::ParcelRequest,
            crate::routes::parcels::ParcelLocation,
            crate::routes::parcels::ParcelView,
            crate::routes::analyses::AnalysisRequest,
            crate::routes::analyses::MeasurementRequest,
            crate::routes::analyses::MeasurementView,
            crate::routes::analyses::AnalysisDetail,
        ),
    ),
    tags(
        (name = "permissions", description = "Dense matrix projection, batch reconciliation, and name-keyed single-pair grants"),
        (name = "roles", description = "Role directory — permission groups with soft deactivation"),
        (name = "interfaces", description = "Interface directory — functional modules gated by the matrix"),
        (name = "geography", description = "Reference geography — countries, departments, municipalities"),
        (name = "elements", description = "Soil-chemistry element catalog"),
        (name = "parcels", description = "Land parcel registry with resolved geography"),
        (name = "analyses", description = "Soil analysis log — headers and element readings"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "AgroSuelo API — Administrative Backend");
        assert_eq!(spec.info.version, "0.3.7");
    }

    #[test]
    fn spec_has_matrix_paths() {
        let spec = ApiDoc::openapi();
        assert!(
            spec.paths.paths.contains_key("/v1/permissions/matrix"),
            "should contain the dense matrix path"
        );
        assert!(
            spec.paths.paths.contains_key("/v1/permissions/reconcile"),
            "should contain the reconcile path"
        );
        assert!(
            spec.paths.paths.contains_key("/v1/permissions/by-name"),
            "should contain the name-resolution path"
        );
    }

    #[test]
    fn spec_has_directory_paths() {
        let spec = ApiDoc::openapi();
        for path in &[
            "/v1/roles",
            "/v1/roles/{id}",
            "/v1/roles/{id}/activate",
            "/v1/interfaces",
            "/v1/geography/countries",
            "/v1/geography/departments",
            "/v1/geography/municipalities",
            "/v1/elements",
            "/v1/parcels",
            "/v1/parcels/{id}",
            "/v1/analyses",
            "/v1/analyses/{id}/measurements",
        ] {
            assert!(
                spec.paths.paths.contains_key(*path),
                "should contain {path}"
            );
        }
    }

    #[test]
    fn spec_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.as_ref().expect("spec should have tags");
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        for expected in &[
            "permissions",
            "roles",
            "interfaces",
            "geography",
            "elements",
            "parcels",
            "analyses",
        ] {
            assert!(tag_names.contains(expected), "should contain {expected} tag");
        }
    }

    #[test]
    fn spec_has_components() {
        let spec = ApiDoc::openapi();
        let schemas = &spec.components.as_ref().expect("components").schemas;
        for name in &[
            "RoleSubmission",
            "RoleRow",
            "InterfaceGrant",
            "MergeMode",
            "PairResponse",
            "ErrorBody",
            "ParcelView",
            "AnalysisDetail",
            "MeasurementRequest",
        ] {
            assert!(schemas.contains_key(*name), "should contain {name} schema");
        }
    }

    #[test]
    fn spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).expect("spec should serialize");
        assert!(json.contains("openapi"));
    }

    #[test]
    fn router_builds_successfully() {
        let _router = router();
    }
}
