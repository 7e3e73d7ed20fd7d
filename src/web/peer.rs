use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Header set by reverse proxies; the first entry is the original client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Header set by some proxies (nginx) with a single client address.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Client address named by proxy headers, if any parse.
pub fn forwarded_peer(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

/// Peer address of a request.
///
/// Proxy headers are only consulted when `trust_forwarded` is set; they are
/// client-controlled otherwise.
pub fn resolve_peer(
    headers: &HeaderMap,
    connect: Option<SocketAddr>,
    trust_forwarded: bool,
) -> Option<IpAddr> {
    trust_forwarded
        .then(|| forwarded_peer(headers))
        .flatten()
        .or(connect.map(|addr| addr.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::Ipv4Addr;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn first_forwarded_entry_wins() {
        let h = headers(&[
            (FORWARDED_FOR_HEADER, "203.0.113.9, 10.0.0.1"),
            (REAL_IP_HEADER, "198.51.100.1"),
        ]);
        assert_eq!(forwarded_peer(&h), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn falls_back_to_real_ip_then_nothing() {
        let h = headers(&[(FORWARDED_FOR_HEADER, "garbage"), (REAL_IP_HEADER, "::1")]);
        assert_eq!(forwarded_peer(&h), Some("::1".parse().unwrap()));
        assert_eq!(forwarded_peer(&HeaderMap::new()), None);
    }

    #[test]
    fn untrusted_headers_are_ignored() {
        let h = headers(&[(FORWARDED_FOR_HEADER, "203.0.113.9")]);
        let connect = SocketAddr::from((Ipv4Addr::new(10, 0, 0, 5), 4000));

        assert_eq!(
            resolve_peer(&h, Some(connect), false),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)))
        );
        assert_eq!(
            resolve_peer(&h, Some(connect), true),
            Some("203.0.113.9".parse().unwrap())
        );
        assert_eq!(resolve_peer(&h, None, false), None);
    }
}
