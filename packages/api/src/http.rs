//! # HTTP client for the Rewardsy REST backend
//!
//! [`HttpApi`] implements [`RemoteApi`] with `reqwest`. The backend is a FastAPI
//! service, so a few of its conventions leak into this module:
//!
//! | Operation | Request | Notes |
//! |-----------|---------|-------|
//! | `login` | `POST /login` (form) | OAuth2 password form: the email goes in `username`. Returns `{access_token, token_type, user}`. |
//! | `register` | `POST /signup` (JSON) | Returns only the created user, so a login follows to obtain a token. |
//! | `logout` | `POST /logout` | Best effort; callers ignore failures. |
//! | `reset_password` | `POST /reset-password` (JSON) | |
//! | `get_tasks` | `GET /tasks?skip=S&limit=N` | Paged: `N` is [`ApiConfig::page_limit`](store::config::ApiConfig); pages are requested until one comes back short. |
//! | `get_task` | `GET /tasks/{id}` | |
//! | `create_task` | `POST /tasks` (JSON) | |
//! | `update_task` | `PUT /tasks/{id}` (JSON) | |
//! | `delete_task` | `DELETE /tasks/{id}` | Responds `204 No Content`. |
//! | `get_activity` | `GET /user/activity?limit=N` | |
//!
//! ## Authentication
//!
//! The bearer token is not held by the client. It is read from the shared
//! [`Storage`] under the configured token key on every request, so whatever the
//! session store last persisted is what gets sent.
//!
//! ## Errors
//!
//! Send failures become [`ApiError::Transport`], non-2xx statuses become
//! [`ApiError::Rejected`] with the `detail` message from the body, and bodies that
//! fail to parse become [`ApiError::Decode`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use store::{Activity, ClientConfig, NewTask, Storage, Task, TaskPatch, User};

use crate::error::{message_from_body, ApiError};
use crate::{AuthSession, Credentials, Registration, RemoteApi};

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    user: User,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    email: &'a str,
}

/// `reqwest`-backed Rewardsy API client.
#[derive(Clone, Debug)]
pub struct HttpApi<S: Storage> {
    client: Client,
    base_url: Url,
    page_limit: u32,
    storage: S,
    token_key: String,
}

impl<S: Storage> HttpApi<S> {
    /// Create a client for `config.api.base_url` reading its token from `storage`.
    pub fn new(config: &ClientConfig, storage: S) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            ApiError::Invalid(format!("Invalid API base URL {}: {}", config.api.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Invalid(format!(
                "Invalid API base URL {}",
                config.api.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            page_limit: config.api.page_limit.max(1),
            storage,
            token_key: config.storage.token_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attach the stored bearer token, if there is one.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.storage.get(&self.token_key) {
            Ok(Some(token)) if !token.is_empty() => request.bearer_auth(token),
            Ok(_) => request,
            Err(e) => {
                tracing::warn!("Failed to read access token: {}", e);
                request
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::Rejected {
            status: status.as_u16(),
            message: message_from_body(&body),
        };
        tracing::warn!("Request rejected: {}", err);
        Err(err)
    }

    async fn task_page(&self, skip: usize) -> Result<Vec<Task>, ApiError> {
        tracing::debug!("GET /tasks skip={} limit={}", skip, self.page_limit);
        let skip = skip.to_string();
        let limit = self.page_limit.to_string();
        let request = self.authorized(
            self.client
                .get(self.endpoint(&["tasks"]))
                .query(&[("skip", skip.as_str()), ("limit", limit.as_str())]),
        );
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl<S: Storage> RemoteApi for HttpApi<S> {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        tracing::debug!("POST /login");
        let request = self.client.post(self.endpoint(&["login"])).form(&[
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
        ]);
        let response = self.send(request).await?;
        let body: LoginResponse = Self::json(response).await?;
        Ok(AuthSession {
            user: body.user,
            token: body.access_token,
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        tracing::debug!("POST /signup");
        let request = self.client.post(self.endpoint(&["signup"])).json(registration);
        let response = self.send(request).await?;
        let _created: User = Self::json(response).await?;
        self.login(&registration.credentials()).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        tracing::debug!("POST /logout");
        let request = self.authorized(self.client.post(self.endpoint(&["logout"])));
        self.send(request).await?;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        tracing::debug!("POST /reset-password");
        let request = self
            .client
            .post(self.endpoint(&["reset-password"]))
            .json(&ResetPasswordRequest { email });
        self.send(request).await?;
        Ok(())
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let mut tasks = Vec::new();
        loop {
            let page = self.task_page(tasks.len()).await?;
            let last = page.len() < self.page_limit as usize;
            tasks.extend(page);
            if last {
                return Ok(tasks);
            }
        }
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        tracing::debug!("GET /tasks/{}", id);
        let request = self.authorized(self.client.get(self.endpoint(&["tasks", id])));
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn create_task(&self, data: &NewTask) -> Result<Task, ApiError> {
        tracing::debug!("POST /tasks");
        let request = self.authorized(self.client.post(self.endpoint(&["tasks"])).json(data));
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, ApiError> {
        tracing::debug!("PUT /tasks/{}", id);
        let request =
            self.authorized(self.client.put(self.endpoint(&["tasks", id])).json(patch));
        let response = self.send(request).await?;
        Self::json(response).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        tracing::debug!("DELETE /tasks/{}", id);
        let request = self.authorized(self.client.delete(self.endpoint(&["tasks", id])));
        self.send(request).await?;
        Ok(())
    }

    async fn get_activity(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        tracing::debug!("GET /user/activity");
        let limit = limit.to_string();
        let request = self.authorized(
            self.client
                .get(self.endpoint(&["user", "activity"]))
                .query(&[("limit", limit.as_str())]),
        );
        let response = self.send(request).await?;
        Self::json(response).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use store::MemoryStorage;

    use super::*;

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Accept one connection, write `response` and return the raw request.
    fn answer(listener: &TcpListener, response: &str) -> String {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);

        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            let done = line == "\r\n" || line.is_empty();
            head.push_str(&line);
            if done {
                break;
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        head.push_str(&String::from_utf8_lossy(&body));

        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        head
    }

    /// Answer one request with `status` and `body`, and hand back the raw request.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = response(status, body);
        let handle = std::thread::spawn(move || answer(&listener, &response));
        (url, handle)
    }

    /// Answer one `200 OK` request per body, in order.
    fn serve_each(bodies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            bodies
                .iter()
                .map(|body| answer(&listener, &response("200 OK", body)))
                .collect()
        });
        (url, handle)
    }

    fn task_json(id: &str, title: &str) -> String {
        format!(
            r#"{{"id":"{id}","title":"{title}","priority":"low","completed":false,"created_at":"2024-05-01T09:00:00Z","updated_at":"2024-05-01T09:00:00Z"}}"#
        )
    }

    fn client_for(url: &str, storage: MemoryStorage) -> HttpApi<MemoryStorage> {
        HttpApi::new(&ClientConfig::default().with_base_url(url), storage).unwrap()
    }

    fn paged_client(url: &str, page_limit: u32) -> HttpApi<MemoryStorage> {
        let mut config = ClientConfig::default().with_base_url(url);
        config.api.page_limit = page_limit;
        HttpApi::new(&config, MemoryStorage::new()).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = client_for("http://localhost:8000/api/", MemoryStorage::new());
        assert_eq!(
            api.endpoint(&["tasks", "a b/c"]).as_str(),
            "http://localhost:8000/api/tasks/a%20b%2Fc"
        );
        let api = client_for("http://localhost:8000", MemoryStorage::new());
        assert_eq!(api.endpoint(&["login"]).as_str(), "http://localhost:8000/login");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let config = ClientConfig::default().with_base_url("not a url");
        let err = HttpApi::new(&config, MemoryStorage::new()).unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));

        let config = ClientConfig::default().with_base_url("mailto:ops@rewardsy.app");
        assert!(HttpApi::new(&config, MemoryStorage::new()).is_err());
    }

    #[test]
    fn test_bearer_token_read_from_storage() {
        let storage = MemoryStorage::new();
        let api = client_for("http://localhost:8000", storage.clone());

        let request = api
            .authorized(api.client.get(api.endpoint(&["tasks"])))
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());

        storage.set("auth_token", "tok123").unwrap();
        let request = api
            .authorized(api.client.get(api.endpoint(&["tasks"])))
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok123"
        );
    }

    #[tokio::test]
    async fn test_login_parses_token_and_user() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"access_token":"h.p.s","token_type":"bearer","user":{"id":1,"email":"a@b.com","name":"Ada"}}"#,
        );
        let api = client_for(&url, MemoryStorage::new());

        let session = api.login(&Credentials::new("a@b.com", "pw")).await.unwrap();
        assert_eq!(session.token, "h.p.s");
        assert_eq!(session.user.id, "1");
        assert_eq!(session.user.display_name(), "Ada");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /login "));
        assert!(request.contains("username=a%40b.com&password=pw"));
    }

    #[tokio::test]
    async fn test_rejection_carries_detail_message() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"detail":"Invalid credentials"}"#);
        let api = client_for(&url, MemoryStorage::new());

        let err = api
            .login(&Credentials::new("a@b.com", "bad"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 401,
                message: Some("Invalid credentials".to_string()),
            }
        );
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_get_tasks_sends_token_and_page_limit() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"id":"1","title":"Buy milk","priority":"low","completed":false,"created_at":"2024-05-01T09:00:00Z","updated_at":"2024-05-01T09:00:00Z"}]"#,
        );
        let storage = MemoryStorage::new();
        storage.set("auth_token", "tok123").unwrap();
        let api = client_for(&url, storage);

        let tasks = api.get_tasks().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /tasks?skip=0&limit=100 "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer tok123"));
    }

    #[tokio::test]
    async fn test_get_tasks_follows_pages() {
        let (url, server) = serve_each(vec![
            format!("[{},{}]", task_json("1", "Read"), task_json("2", "Run")),
            format!("[{}]", task_json("3", "Rest")),
        ]);
        let api = paged_client(&url, 2);

        let tasks = api.get_tasks().await.unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /tasks?skip=0&limit=2 "));
        assert!(requests[1].starts_with("GET /tasks?skip=2&limit=2 "));
    }

    #[tokio::test]
    async fn test_get_tasks_stops_on_empty_page() {
        let (url, server) = serve_each(vec![
            format!("[{},{}]", task_json("1", "Read"), task_json("2", "Run")),
            "[]".to_string(),
        ]);
        let api = paged_client(&url, 2);

        assert_eq!(api.get_tasks().await.unwrap().len(), 2);
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_task_and_activity() {
        let (url, server) = serve_each(vec![
            task_json("a b", "Read"),
            r#"[{"id":"e1","type":"task_created","description":"Task event: task_created","timestamp":"2024-05-01T09:00:00","task_id":"1"}]"#.to_string(),
        ]);
        let api = client_for(&url, MemoryStorage::new());

        let task = api.get_task("a b").await.unwrap();
        assert_eq!(task.title, "Read");
        let activity = api.get_activity(20).await.unwrap();
        assert_eq!(activity[0].kind.as_deref(), Some("task_created"));

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /tasks/a%20b "));
        assert!(requests[1].starts_with("GET /user/activity?limit=20 "));
    }

    #[tokio::test]
    async fn test_patch_clears_fields_with_null() {
        let (url, server) = serve_once("200 OK", &task_json("1", "Read"));
        let api = client_for(&url, MemoryStorage::new());

        api.update_task("1", &TaskPatch::default().with_due_date(None))
            .await
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.contains(r#"{"due_date":null}"#));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (url, server) = serve_once("200 OK", r#"{"not":"a task"}"#);
        let api = client_for(&url, MemoryStorage::new());

        let err = api
            .update_task("1", &TaskPatch::completion(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        let request = server.join().unwrap();
        assert!(request.starts_with("PUT /tasks/1 "));
        assert!(request.contains(r#"{"completed":true}"#));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let api = client_for(&format!("http://127.0.0.1:{port}"), MemoryStorage::new());

        let err = api.delete_task("1").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
