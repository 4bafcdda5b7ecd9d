//! The transport collaborator: everything the SDK needs from the network.
use std::time::Duration;

use reqwest::{StatusCode, Url};

use crate::{
    events::TrackPayload,
    flags::{FlagSet, Tags},
    Error, Result,
};

const FLAGS_ENDPOINT: &str = "/v1/flags";
const TRACK_ENDPOINT: &str = "/v1/track";

/// Fetches flag sets and submits events on behalf of the [`Client`](crate::Client).
///
/// Implementations must bound every call in time and report a rejected API key as
/// [`Error::Unauthorized`]. The default implementation is [`HttpTransport`]; provide your own via
/// [`ClientConfig::transport`](crate::ClientConfig::transport) to route requests differently or
/// to fake the server in tests.
pub trait Transport: Send + Sync {
    /// Fetch the full flag set visible to `api_key` under `tags`.
    fn fetch_flags(&self, api_key: &str, tags: &Tags) -> Result<FlagSet>;

    /// Submit a single conversion event.
    fn post_event(&self, api_key: &str, payload: &TrackPayload) -> Result<()>;
}

/// Blocking HTTP transport.
///
/// The API key is sent as a bearer token (`Authorization: Bearer <api_key>`) and never appears in
/// URLs or request bodies.
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    flags_url: Url,
    track_url: Url,
}

impl HttpTransport {
    /// Create a transport talking to `base_url`, failing every request that takes longer than
    /// `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<HttpTransport> {
        let base_url = base_url.trim_end_matches('/');

        let flags_url = Url::parse_with_params(
            &format!("{base_url}{FLAGS_ENDPOINT}"),
            &[("sdkName", "rust"), ("sdkVersion", env!("CARGO_PKG_VERSION"))],
        )
        .map_err(Error::InvalidBaseUrl)?;
        let track_url =
            Url::parse(&format!("{base_url}{TRACK_ENDPOINT}")).map_err(Error::InvalidBaseUrl)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("setbit-rust/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpTransport {
            client,
            flags_url,
            track_url,
        })
    }

    fn flags_url(&self, tags: &Tags) -> Url {
        let mut url = self.flags_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in tags {
                query.append_pair(&format!("tag.{key}"), value);
            }
        }
        url
    }
}

impl Transport for HttpTransport {
    fn fetch_flags(&self, api_key: &str, tags: &Tags) -> Result<FlagSet> {
        log::debug!(target: "setbit", "fetching flags");
        let response = self
            .client
            .get(self.flags_url(tags))
            .bearer_auth(api_key)
            .send()?;

        match response.status() {
            status if status.is_success() => {
                let flags = response.json()?;
                log::debug!(target: "setbit", "successfully fetched flags");
                Ok(flags)
            }
            StatusCode::UNAUTHORIZED => {
                log::warn!(target: "setbit", "client is not authorized. Check your API key");
                Err(Error::Unauthorized)
            }
            status => {
                log::warn!(target: "setbit", status = status.as_u16(); "received non-200 response while fetching flags");
                Err(Error::UnexpectedStatus(status.as_u16()))
            }
        }
    }

    fn post_event(&self, api_key: &str, payload: &TrackPayload) -> Result<()> {
        let response = self
            .client
            .post(self.track_url.clone())
            .bearer_auth(api_key)
            .json(payload)
            .send()?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            status => Err(Error::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        sync::{Arc, Mutex},
        time::Duration,
    };

    use serde_json::json;

    use super::{HttpTransport, Transport};
    use crate::{
        events::ConversionEvent,
        flags::{Tags, TryParse},
        Error,
    };

    /// Answers one connection per canned `(status line, body)` pair and records each raw request.
    fn canned_server(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        {
            let requests = requests.clone();
            std::thread::spawn(move || {
                for (status, body) in responses {
                    let (mut stream, _) = listener.accept().unwrap();
                    requests.lock().unwrap().push(read_request(&mut stream));
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).unwrap();
                }
            });
        }
        (format!("http://{addr}"), requests)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break data.len();
            }
            data.extend_from_slice(&buf[..n]);
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&data[..head_end]).into_owned();
        let content_length = header(&head, "content-length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        while data.len() < head_end + content_length {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
        request.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    #[test]
    fn builds_endpoint_urls() {
        let transport =
            HttpTransport::new("https://flags.example.com/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.track_url.as_str(), "https://flags.example.com/v1/track");
        assert_eq!(transport.flags_url.path(), "/v1/flags");
        assert!(transport
            .flags_url
            .query_pairs()
            .any(|(k, v)| k == "sdkName" && v == "rust"));
    }

    #[test]
    fn passes_tags_as_query_parameters() {
        let transport =
            HttpTransport::new("https://flags.example.com", Duration::from_secs(1)).unwrap();
        let tags = Tags::from([
            ("env".to_owned(), "production".to_owned()),
            ("app".to_owned(), "web shop".to_owned()),
        ]);
        let url = transport.flags_url(&tags);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("tag.env".to_owned(), "production".to_owned())));
        assert!(pairs.contains(&("tag.app".to_owned(), "web shop".to_owned())));
    }

    #[test]
    fn api_key_never_in_url() {
        let transport =
            HttpTransport::new("https://flags.example.com", Duration::from_secs(1)).unwrap();
        let url = transport.flags_url(&Tags::new());
        assert!(!url.as_str().contains("apiKey"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new("not a url", Duration::from_secs(1)),
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn fetch_flags_maps_response_status() {
        let (base_url, requests) = canned_server(vec![
            ("401 Unauthorized", ""),
            ("503 Service Unavailable", ""),
            ("200 OK", r#"{"new-checkout":{"enabled":true}}"#),
        ]);
        let transport = HttpTransport::new(&base_url, Duration::from_secs(5)).unwrap();
        let tags = Tags::from([("env".to_owned(), "production".to_owned())]);

        assert!(matches!(
            transport.fetch_flags("test_key", &tags),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            transport.fetch_flags("test_key", &tags),
            Err(Error::UnexpectedStatus(503))
        ));
        let flags = transport.fetch_flags("test_key", &tags).unwrap();
        assert_eq!(flags.len(), 1);
        assert!(matches!(
            &flags["new-checkout"],
            TryParse::Parsed(flag) if flag.enabled
        ));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        for request in requests.iter() {
            assert!(request.starts_with("GET /v1/flags?"));
            assert!(request.lines().next().unwrap().contains("tag.env=production"));
            assert_eq!(header(request, "authorization"), Some("Bearer test_key"));
        }
    }

    #[test]
    fn post_event_maps_response_status() {
        let (base_url, requests) = canned_server(vec![
            ("401 Unauthorized", ""),
            ("500 Internal Server Error", ""),
            ("200 OK", ""),
        ]);
        let transport = HttpTransport::new(&base_url, Duration::from_secs(5)).unwrap();
        let payload = ConversionEvent::new("purchase", "user_123")
            .metadata("amount", 99.99)
            .to_payload();

        assert!(matches!(
            transport.post_event("test_key", &payload),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            transport.post_event("test_key", &payload),
            Err(Error::UnexpectedStatus(500))
        ));
        transport.post_event("test_key", &payload).unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        for request in requests.iter() {
            assert!(request.starts_with("POST /v1/track "));
            assert_eq!(header(request, "authorization"), Some("Bearer test_key"));
            assert_eq!(header(request, "content-type"), Some("application/json"));

            let (_, body) = request.split_once("\r\n\r\n").unwrap();
            let body: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(body["userId"], json!("user_123"));
            assert_eq!(body["eventName"], json!("purchase"));
            assert_eq!(body["metadata"]["amount"], json!(99.99));
            assert!(body.get("apiKey").is_none());
        }
    }
}
