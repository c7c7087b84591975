//! S3-compatible endpoint configuration

#[derive(Debug, Clone)]
pub struct S3Config {
    /// Host, optionally with scheme (e.g. `s3.us-east-1.amazonaws.com` or
    /// `http://localhost:9000` for a MinIO-style endpoint).
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// `https://host/bucket/key` instead of `https://bucket.host/key`.
    pub use_path_style: bool,
    pub use_ssl: bool,
}

impl S3Config {
    fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    fn bare_host(&self) -> &str {
        self.endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }

    /// The `Host` header value a signed request must use, matching
    /// whichever addressing style the request URL uses.
    pub fn build_host_header(&self) -> String {
        if self.use_path_style {
            self.bare_host().to_string()
        } else {
            format!("{}.{}", self.bucket, self.bare_host())
        }
    }

    /// The base URL a key is appended to, already path- or virtual-hosted
    /// style per `use_path_style`.
    pub fn build_base_url(&self) -> String {
        if self.use_path_style {
            format!("{}://{}/{}", self.scheme(), self.bare_host(), self.bucket)
        } else {
            format!("{}://{}.{}", self.scheme(), self.bucket, self.bare_host())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path_style: bool) -> S3Config {
        S3Config {
            endpoint: "s3.amazonaws.com".to_string(),
            bucket: "my-bucket".to_string(),
            region: "us-east-1".to_string(),
            access_key: "AKIA".to_string(),
            secret_key: "secret".to_string(),
            use_path_style: path_style,
            use_ssl: true,
        }
    }

    #[test]
    fn path_style_puts_bucket_in_the_path() {
        let c = config(true);
        assert_eq!(c.build_base_url(), "https://s3.amazonaws.com/my-bucket");
        assert_eq!(c.build_host_header(), "s3.amazonaws.com");
    }

    #[test]
    fn virtual_hosted_style_puts_bucket_in_the_host() {
        let c = config(false);
        assert_eq!(c.build_base_url(), "https://my-bucket.s3.amazonaws.com");
        assert_eq!(c.build_host_header(), "my-bucket.s3.amazonaws.com");
    }
}
