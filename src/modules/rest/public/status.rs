use crate::modules::context::status::MailBoardStatus;
use poem::{handler, web::Json, IntoResponse};

#[handler]
pub async fn get_status() -> impl IntoResponse {
    Json(MailBoardStatus::get())
}
