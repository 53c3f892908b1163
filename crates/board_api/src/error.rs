use actix_web::{HttpResponse, http::StatusCode};
use boards_lib::error::BoardsError;

#[derive(thiserror::Error, Debug)]
#[repr(i32)] // i32 to be used with clients that don't support unsigned integers
#[rustfmt::skip]
pub enum ApiErrorKind {
    // --------
    // --- Internal server errors
    // --------

    #[error(transparent)]
    IOError(#[from] std::io::Error) = 101,
    #[error("unknown error: {0}")]
    Unknown(String) = 105,

    // --------
    // --- Logical errors
    // --------

    #[error("not found")]
    EndpointNotFound = 301,

    #[error(transparent)]
    Lib(#[from] BoardsError),
}

#[derive(serde::Serialize)]
pub struct ApiErrorResponse {
    pub r#type: i32,
    pub message: String,
}

impl actix_web::ResponseError for ApiErrorKind {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let (r#type, status_code) = self.get_err_type_and_status_code();
        let message = self.to_string();
        HttpResponse::build(status_code).json(ApiErrorResponse { r#type, message })
    }
}

impl ApiErrorKind {
    pub fn get_err_type_and_status_code(&self) -> (i32, StatusCode) {
        use ApiErrorKind as E;
        use BoardsError as LE;
        use StatusCode as S;

        match self {
            E::IOError(_) => (101, S::INTERNAL_SERVER_ERROR),
            E::Lib(LE::MySql(_)) => (102, S::INTERNAL_SERVER_ERROR),
            E::Lib(LE::Internal(_)) => (103, S::INTERNAL_SERVER_ERROR),
            E::Unknown(_) => (105, S::INTERNAL_SERVER_ERROR),

            E::EndpointNotFound => (301, S::NOT_FOUND),
            E::Lib(LE::InvalidBoolean { .. }) => (302, S::BAD_REQUEST),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiErrorKind>;

/// Converts a `Result<T, E>` in which `E` is convertible to
/// [`BoardsError`] into an [`ApiResult<T>`].
pub trait ApiResultExt<T> {
    fn with_api_err(self) -> ApiResult<T>;
}

impl<T, E> ApiResultExt<T> for Result<T, E>
where
    BoardsError: From<E>,
{
    fn with_api_err(self) -> ApiResult<T> {
        self.map_err(BoardsError::from).map_err(Into::into)
    }
}
