//! OpenAPI document for the REST DTOs

use super::dto::*;
use super::error::Problem;
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Helpdesk Service", description = "Tickets, direct messages and profiles"),
    components(schemas(
        TicketDto,
        TicketFormDto,
        TicketsPageDto,
        TicketActionResponse,
        CommentDto,
        ProfileSummaryDto,
        ProfileDto,
        AccountDto,
        LastMessageDto,
        ChatSummaryDto,
        ChatListDto,
        MessageDto,
        ChatPageDto,
        AuthPageDto,
        MessageResponse,
        QueryEchoDto,
        Problem,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_page_schemas() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.unwrap().schemas;
        for name in ["TicketsPageDto", "ChatListDto", "ChatPageDto", "Problem"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}
