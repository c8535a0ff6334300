use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vacancy Intake API",
        version = "0.1.0",
        description = "Vacancy submission with human approval."
    ),
    paths(
        crate::routes::submit_vacancy,
        crate::routes::approve_vacancy,
        crate::routes::reject_vacancy,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SubmitVacancyRequest,
        crate::dto::SubmitVacancyResponse,
        crate::dto::VacancyBody,
        crate::dto::DecisionResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "vacancies", description = "Vacancy submission"),
        (name = "approvals", description = "Reviewer decision callbacks"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::with_description(
                            "X-Api-Key",
                            "Set via VACANCY_SERVER_API_KEY.",
                        ),
                    ),
                ),
            );
        }
    }
}
