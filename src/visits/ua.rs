use lazy_static::lazy_static;
use regex::Regex;

use super::VisitInfo;

/// Best-effort user-agent classification. Anything unrecognized collapses
/// into literal "Unknown ..." placeholders; parsing never fails a login.
pub fn summarize(ip_address: &str, user_agent: &str) -> VisitInfo {
    let browser = browser_name(user_agent);
    let os = os_name(user_agent);
    let device_type = device_bucket(user_agent, &os);
    let vendor = vendor_name(user_agent);
    let model = model_name(user_agent);
    let cpu = cpu_arch(user_agent);

    let summary = format!(
        "{} on a {} {} from {} model {} with {} CPU",
        browser, os, device_type, vendor, model, cpu
    );

    VisitInfo {
        ip_address: ip_address.to_string(),
        device_type,
        user_agent: summary,
    }
}

fn browser_name(ua: &str) -> &'static str {
    // Order matters: Chrome-derived browsers keep a Chrome/ token, and
    // everything WebKit keeps a Safari/ token.
    if ua.contains("Edg/") || ua.contains("Edge/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        "Unknown Browser"
    }
}

fn os_name(ua: &str) -> String {
    lazy_static! {
        static ref ANDROID_RE: Regex = Regex::new(r"Android[ ]?([0-9.]*)").unwrap();
        static ref WINDOWS_RE: Regex = Regex::new(r"Windows NT ([0-9.]+)").unwrap();
        static ref MAC_RE: Regex = Regex::new(r"Mac OS X ([0-9_.]+)").unwrap();
        static ref IOS_RE: Regex = Regex::new(r"(?:iPhone|CPU) OS ([0-9_]+)").unwrap();
    }

    if let Some(caps) = ANDROID_RE.captures(ua) {
        let version = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return format!("Android {version}").trim().to_string();
    }
    if ua.contains("iPhone") || ua.contains("iPad") {
        if let Some(caps) = IOS_RE.captures(ua) {
            let version = caps.get(1).map(|m| m.as_str().replace('_', ".")).unwrap_or_default();
            return format!("iOS {version}").trim().to_string();
        }
        return "iOS".to_string();
    }
    if let Some(caps) = WINDOWS_RE.captures(ua) {
        let version = match caps.get(1).map(|m| m.as_str()) {
            Some("10.0") => "10",
            Some("6.3") => "8.1",
            Some("6.2") => "8",
            Some("6.1") => "7",
            Some(v) => v,
            None => "",
        };
        return format!("Windows {version}").trim().to_string();
    }
    if let Some(caps) = MAC_RE.captures(ua) {
        let version = caps.get(1).map(|m| m.as_str().replace('_', ".")).unwrap_or_default();
        return format!("Mac OS X {version}").trim().to_string();
    }
    if ua.contains("Linux") {
        return "Linux".to_string();
    }
    "Unknown OS".to_string()
}

fn device_bucket(ua: &str, os: &str) -> String {
    let os_lower = os.to_lowercase();
    if os_lower.contains("android") {
        if ua.contains("TV") {
            return "Android TV".to_string();
        }
        if ua.contains("Mobile") || ua.contains("Tablet") {
            return "Android Phone".to_string();
        }
        return "Android Device".to_string();
    }
    if os_lower.contains("windows") {
        return "Windows PC".to_string();
    }
    if os_lower.contains("mac") {
        return "Mac".to_string();
    }
    if ua.contains("PlayStation") || ua.contains("Xbox") || ua.contains("Nintendo") {
        return "Console".to_string();
    }
    if ua.contains("Watch") {
        return "Wearable".to_string();
    }
    // A mobile/tablet hint outside the named platforms stays unclassified;
    // no hint at all reads as an embedded client.
    let has_device_hint =
        ua.contains("Mobile") || ua.contains("Tablet") || ua.contains("iPhone") || ua.contains("iPad");
    if has_device_hint {
        "Unknown Device".to_string()
    } else {
        "Embedded Device".to_string()
    }
}

fn vendor_name(ua: &str) -> &'static str {
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("Macintosh") {
        "Apple"
    } else if ua.contains("SM-") || ua.contains("Samsung") {
        "Samsung"
    } else if ua.contains("Pixel") {
        "Google"
    } else {
        "Unknown Vendor"
    }
}

fn model_name(ua: &str) -> String {
    lazy_static! {
        static ref MODEL_RE: Regex = Regex::new(r";\s*([A-Za-z0-9 _-]+?)\s+Build/").unwrap();
    }
    MODEL_RE
        .captures(ua)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn cpu_arch(ua: &str) -> &'static str {
    if ua.contains("aarch64") || ua.contains("arm64") {
        "arm64"
    } else if ua.contains("x86_64") || ua.contains("x64") || ua.contains("Win64") || ua.contains("WOW64")
    {
        "amd64"
    } else {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_a_windows_desktop() {
        let visit = summarize(
            "198.51.100.4",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        assert_eq!(visit.device_type, "Windows PC");
        assert_eq!(
            visit.user_agent,
            "Chrome on a Windows 10 Windows PC from Unknown Vendor model  with amd64 CPU"
        );
    }

    #[test]
    fn classifies_an_android_phone_with_model() {
        let visit = summarize(
            "198.51.100.4",
            "Mozilla/5.0 (Linux; Android 13; SM-G991B Build/TP1A.220624.014) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Mobile Safari/537.36",
        );
        assert_eq!(visit.device_type, "Android Phone");
        assert!(visit.user_agent.starts_with("Chrome on a Android 13 Android Phone"));
        assert!(visit.user_agent.contains("from Samsung model SM-G991B"));
    }

    #[test]
    fn classifies_a_mac_safari() {
        let visit = summarize(
            "198.51.100.4",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        );
        assert_eq!(visit.device_type, "Mac");
        assert!(visit.user_agent.starts_with("Safari on a Mac OS X 10.15.7 Mac from Apple"));
    }

    #[test]
    fn iphone_stays_an_unknown_device() {
        let visit = summarize(
            "198.51.100.4",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(visit.device_type, "Unknown Device");
        assert!(visit.user_agent.contains("from Apple"));
    }

    #[test]
    fn empty_agent_collapses_into_placeholders() {
        let visit = summarize("198.51.100.4", "");
        assert_eq!(visit.device_type, "Embedded Device");
        assert_eq!(
            visit.user_agent,
            "Unknown Browser on a Unknown OS Embedded Device from Unknown Vendor model  with Unknown CPU"
        );
        assert_eq!(visit.ip_address, "198.51.100.4");
    }
}
