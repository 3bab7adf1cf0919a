use std::collections::BTreeMap;

use crate::settings::Settings;
use crate::token::{TokenGenerator, TOKEN_HEADER};
use crate::{Error, Result};

pub type Params = BTreeMap<String, String>;
pub type Headers = BTreeMap<String, String>;

/// How the API encodes the page position into `seoKey` and `sid`.
/// The pattern is observed, not documented, so it can be swapped out.
pub trait SeoPagination: Send + Sync {
    fn seo_key(&self, keyword: &str, location_seo: &str, page: u32) -> String;
    fn sid(&self, base_sid: &str, page: u32) -> String;
}

/// `sre-jobs-in-bangalore`, `sre-jobs-in-bangalore-2`, ... and `{sid}_1`, `{sid}_2`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct ObservedPattern;

impl SeoPagination for ObservedPattern {
    fn seo_key(&self, keyword: &str, location_seo: &str, page: u32) -> String {
        let keyword_seo = keyword.replace(' ', "-");
        if page <= 1 {
            format!("{keyword_seo}-jobs-{location_seo}")
        } else {
            format!("{keyword_seo}-jobs-{location_seo}-{page}")
        }
    }

    fn sid(&self, base_sid: &str, page: u32) -> String {
        format!("{base_sid}_{}", page.max(1))
    }
}

/// Derives the query parameters of one page from the static base parameters.
pub fn build_params(
    pattern: &dyn SeoPagination,
    base_params: &Params,
    keyword: &str,
    filter: &str,
    page: u32,
    base_sid: &str,
    location_seo: &str,
) -> Params {
    let mut params = base_params.clone();
    params.insert("pageNo".into(), page.to_string());
    params.insert("ctcFilter".into(), filter.into());
    params.insert("keyword".into(), keyword.into());
    params.insert("k".into(), keyword.into());
    params.insert("seoKey".into(), pattern.seo_key(keyword, location_seo, page));
    params.insert("sid".into(), pattern.sid(base_sid, page));
    params
}

/// Everything needed to fetch one page. Built once per page and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub keyword: String,
    pub filter: String,
    pub page: u32,
    pub params: Params,
    pub headers: Headers,
}

impl PageRequest {
    /// Builds the params, then asks `tokens` for the token and attaches it to the base headers.
    pub fn new(
        settings: &Settings,
        pattern: &dyn SeoPagination,
        tokens: &dyn TokenGenerator,
        filter: &str,
        page: u32,
    ) -> Result<Self> {
        let params = build_params(
            pattern,
            &settings.base_params,
            &settings.keyword,
            filter,
            page,
            &settings.base_sid,
            &settings.location_seo,
        );
        let mut headers = settings.base_headers.clone();
        let token = tokens.generate(page, &params, &headers)?;
        if token.is_empty() {
            return Err(Error::TokenGeneration {
                page,
                reason: "generator returned an empty token".into(),
            });
        }
        headers.insert(TOKEN_HEADER.into(), token);

        Ok(Self {
            keyword: settings.keyword.clone(),
            filter: filter.into(),
            page,
            params,
            headers,
        })
    }

    pub fn seo_key(&self) -> Option<&str> {
        self.params.get("seoKey").map(String::as_str)
    }

    pub fn sid(&self) -> Option<&str> {
        self.params.get("sid").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{StaticToken, UnconfiguredToken};

    const BASE_SID: &str = "17457332530584631";

    fn params_for(page: u32) -> Params {
        build_params(
            &ObservedPattern,
            &Params::new(),
            "sre",
            "25to50",
            page,
            BASE_SID,
            "in-bangalore",
        )
    }

    #[test]
    fn first_page_has_no_seo_suffix() {
        let params = params_for(1);
        assert_eq!(params["seoKey"], "sre-jobs-in-bangalore");
        assert_eq!(params["sid"], format!("{BASE_SID}_1"));
        assert_eq!(params["pageNo"], "1");
        assert_eq!(params["ctcFilter"], "25to50");
    }

    #[test]
    fn later_pages_append_page_number() {
        let params = params_for(3);
        assert_eq!(params["seoKey"], "sre-jobs-in-bangalore-3");
        assert_eq!(params["sid"], format!("{BASE_SID}_3"));
        assert_eq!(params["pageNo"], "3");
    }

    #[test]
    fn keyword_overrides_base_params() {
        let mut base = Params::new();
        base.insert("keyword".into(), "old".into());
        base.insert("k".into(), "old".into());
        base.insert("sort".into(), "r".into());
        let params = build_params(
            &ObservedPattern,
            &base,
            "site reliability",
            "3to6",
            2,
            BASE_SID,
            "in-pune",
        );
        assert_eq!(params["keyword"], "site reliability");
        assert_eq!(params["k"], "site reliability");
        assert_eq!(params["sort"], "r");
        assert_eq!(params["seoKey"], "site-reliability-jobs-in-pune-2");
    }

    #[test]
    fn page_request_carries_token_header() {
        let settings = Settings::default();
        let req = PageRequest::new(
            &settings,
            &ObservedPattern,
            &StaticToken::new("tok"),
            "25to50",
            2,
        )
        .unwrap();
        assert_eq!(req.headers[TOKEN_HEADER], "tok");
        assert_eq!(req.headers["appid"], "109");
        assert_eq!(req.seo_key(), Some("sre-jobs-in-bangalore-2"));
        assert_eq!(req.sid(), Some("17457332530584631_2"));
    }

    #[test]
    fn page_request_fails_without_token() {
        let settings = Settings::default();
        let err = PageRequest::new(&settings, &ObservedPattern, &UnconfiguredToken, "25to50", 1)
            .unwrap_err();
        assert!(matches!(err, Error::TokenGeneration { page: 1, .. }));
    }
}
