//! HTTP implementation of [`RoomApi`]

use async_trait::async_trait;
use danmu_common::ApiSettings;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, DanmuInfo, NavInfo, RoomInfo};
use crate::traits::RoomApi;

/// Browser user agent sent with API requests and the socket handshake
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36";

const REFERER_URL: &str = "https://live.bilibili.com/";

/// [`RoomApi`] backed by the public live HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpRoomApi {
    client: Client,
    live_base_url: String,
    main_base_url: String,
}

impl HttpRoomApi {
    /// Build a client from settings
    pub fn new(settings: &ApiSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            live_base_url: settings.live_base_url.trim_end_matches('/').to_string(),
            main_base_url: settings.main_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn headers(cookie: Option<&str>) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            let value = HeaderValue::from_str(cookie)
                .map_err(|_| ApiError::InvalidResponse("cookie is not a valid header value".to_string()))?;
            headers.insert(COOKIE, value);
        }
        Ok(headers)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, cookie: Option<&str>) -> ApiResult<T> {
        tracing::debug!(url = %url, "Room API request");

        let response: ApiResponse<T> = self
            .client
            .get(url)
            .headers(Self::headers(cookie)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()
    }
}

#[async_trait]
impl RoomApi for HttpRoomApi {
    async fn room_info(&self, room_id: u64) -> ApiResult<RoomInfo> {
        let url = format!("{}/room/v1/Room/room_init?id={room_id}", self.live_base_url);
        self.get(&url, None).await
    }

    async fn danmu_info(&self, room_id: u64, cookie: Option<&str>) -> ApiResult<DanmuInfo> {
        let url = format!(
            "{}/xlive/web-room/v1/index/getDanmuInfo?id={room_id}&type=0",
            self.live_base_url
        );
        self.get(&url, cookie).await
    }

    async fn user_id(&self, cookie: &str) -> ApiResult<u64> {
        let url = format!("{}/x/web-interface/nav", self.main_base_url);
        let nav: NavInfo = self.get(&url, Some(cookie)).await?;
        if !nav.is_login || nav.mid == 0 {
            return Err(ApiError::NotLoggedIn);
        }
        Ok(nav.mid)
    }
}
