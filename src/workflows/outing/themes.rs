use super::domain::Route;

/// Seasonal base set every route gets offered.
const SEASONAL_THEMES: [&str; 4] = ["春日赏花", "山野徒步", "周末逃离", "自然疗愈"];

/// Tag → theme rule table.
const TAG_THEMES: [(&str, &str); 5] = [
    ("风景", "绝美风光"),
    ("茶文化", "茶香之旅"),
    ("古镇", "文化探索"),
    ("文化", "文化探索"),
    ("亲子", "亲子时光"),
];

const RELAXED_TAG: &str = "轻松";
const RELAXED_THEME: &str = "轻松休闲";

/// Location → theme rule table, matched on substring.
const LOCATION_THEMES: [(&str, &str); 2] = [("苏州", "苏式生活"), ("上海", "都市绿洲")];

/// Theme candidates for a route: the seasonal base set, then tag-derived
/// themes, then location-derived ones, deduplicated in that order. A
/// free-text override on top of these is the caller's concern.
pub fn suggest(route: &Route) -> Vec<String> {
    let mut themes: Vec<&str> = SEASONAL_THEMES.to_vec();

    for (tag, theme) in TAG_THEMES {
        if route.has_tag(tag) {
            themes.push(theme);
        }
    }
    if route.has_tag(RELAXED_TAG) {
        themes.push(RELAXED_THEME);
    }

    for (needle, theme) in LOCATION_THEMES {
        if route.location.contains(needle) {
            themes.push(theme);
        }
    }

    let mut seen = Vec::with_capacity(themes.len());
    for theme in themes {
        if !seen.iter().any(|kept: &String| kept == theme) {
            seen.push(theme.to_string());
        }
    }
    seen
}
