/// Compiles a CSS selector once and hands out a `&'static Selector`.
#[macro_export]
macro_rules! selector {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static SELECTOR: Lazy<Selector> =
            Lazy::new(|| Selector::parse($e).expect("hard-coded selector must be valid"));
        &*SELECTOR
    }};
}

/// Same as [`selector!`], for regular expressions.
#[macro_export]
macro_rules! regex {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::regex::Regex;
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new($e).expect("hard-coded regex must be valid"));
        &*PATTERN
    }};
}
