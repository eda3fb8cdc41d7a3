use crate::domain::model::ApiProfile;
use std::collections::BTreeMap;

pub const DEFAULT_CATALOG_PATH: &str = "collectedData.json";
pub const DEFAULT_RELAY_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_RELAY_ENDPOINT: &str = "http://127.0.0.1:5000/proxy";
pub const DEFAULT_OUTPUT_STEM: &str = "output_all_programs";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_CONCURRENT_PAGES: usize = 32;
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

pub const DEFAULT_API_BASE_URL: &str = "https://api-sscasn.bkn.go.id/2024/portal/spf";
pub const DEFAULT_LABEL_FIELD: &str = "program_studi";

/// 遠端 API 的同站政策只接受來自官方入口網站的瀏覽器請求
pub fn browser_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        ),
        ("Accept", "application/json, text/plain, */*"),
        ("Accept-Encoding", "gzip, deflate, br, zstd"),
        ("Accept-Language", "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
        ("Connection", "keep-alive"),
        ("Host", "api-sscasn.bkn.go.id"),
        ("Origin", "https://sscasn.bkn.go.id"),
        ("Referer", "https://sscasn.bkn.go.id/"),
        ("Sec-Fetch-Dest", "empty"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Site", "same-site"),
        (
            "sec-ch-ua",
            "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for ApiProfile {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            id_param: "kode_ref_pend".to_string(),
            filter_param: "pengadaan_kd".to_string(),
            filter_value: serde_json::Value::from(3),
            offset_param: "offset".to_string(),
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            headers: browser_headers(),
        }
    }
}
