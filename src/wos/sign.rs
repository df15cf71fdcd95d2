//! Request signing for the gift code API.
//!
//! Every request body is the form parameters sorted by key, prefixed with
//! `sign=<md5(form + secret)>`.

use md5::{Digest, Md5};

/// Joins parameters as `k=v&...`, sorted by key.
#[must_use]
pub fn form_string(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex MD5 of `form + secret`.
#[must_use]
pub fn signature(form: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(form.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Builds the signed request body `sign=<hex>&<form>`.
///
/// # Arguments
/// * `params` - Form fields in any order
/// * `secret` - Shared secret from `[wos].secret`
///
/// # Returns
/// The URL-encoded body the gift code API expects, signature first.
#[must_use]
pub fn sign_form(params: &[(&str, String)], secret: &str) -> String {
    let form = form_string(params);
    let sign = signature(&form, secret);
    format!("sign={sign}&{form}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_string_sorts_keys() {
        let params = [
            ("time", "1700000000000".to_string()),
            ("fid", "123456789".to_string()),
            ("cdk", "FROST".to_string()),
        ];
        assert_eq!(
            form_string(&params),
            "cdk=FROST&fid=123456789&time=1700000000000"
        );
    }

    #[test]
    fn test_signature_is_md5_of_form_and_secret() {
        // md5("abc")
        assert_eq!(signature("ab", "c"), "900150983cd24fb0d6963f7d28e17f72");
        // md5("")
        assert_eq!(signature("", ""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_sign_form_layout() {
        let params = [("fid", "1".to_string()), ("time", "2".to_string())];
        let body = sign_form(&params, "secret");
        let expected_sign = signature("fid=1&time=2", "secret");
        assert_eq!(body, format!("sign={expected_sign}&fid=1&time=2"));
        assert_eq!(expected_sign.len(), 32);
    }
}
