//! Session cookie builders.

use chrono::Duration;

use medgate_contracts::wire::{SetCookie, ACCESS_COOKIE, REFRESH_COOKIE};

use crate::config::CookiePolicy;

fn cookie(policy: CookiePolicy, name: &str, value: &str, max_age: Duration) -> SetCookie {
    SetCookie {
        name: name.to_string(),
        value: value.to_string(),
        max_age: max_age.num_seconds(),
        http_only: true,
        secure: policy.secure(),
        same_site: policy.same_site(),
    }
}

pub fn access_cookie(policy: CookiePolicy, token: &str, ttl: Duration) -> SetCookie {
    cookie(policy, ACCESS_COOKIE, token, ttl)
}

pub fn refresh_cookie(policy: CookiePolicy, token: &str, ttl: Duration) -> SetCookie {
    cookie(policy, REFRESH_COOKIE, token, ttl)
}

/// `Max-Age=0` for both session cookies.
pub fn clear_session(policy: CookiePolicy) -> Vec<SetCookie> {
    vec![
        cookie(policy, ACCESS_COOKIE, "", Duration::zero()),
        cookie(policy, REFRESH_COOKIE, "", Duration::zero()),
    ]
}
