pub(crate) const TAG_STR: &str = "!!str";
pub(crate) const TAG_STR_SHORTHAND: &str = "!str";
pub(crate) const TAG_STR_CANONICAL: &str = "tag:yaml.org,2002:str";

pub(crate) const TAG_INT: &str = "!!int";
pub(crate) const TAG_INT_SHORTHAND: &str = "!int";
pub(crate) const TAG_INT_CANONICAL: &str = "tag:yaml.org,2002:int";

pub(crate) const TAG_FLOAT: &str = "!!float";
pub(crate) const TAG_FLOAT_SHORTHAND: &str = "!float";
pub(crate) const TAG_FLOAT_CANONICAL: &str = "tag:yaml.org,2002:float";

pub(crate) const TAG_BOOL: &str = "!!bool";
pub(crate) const TAG_BOOL_SHORTHAND: &str = "!bool";
pub(crate) const TAG_BOOL_CANONICAL: &str = "tag:yaml.org,2002:bool";

pub(crate) const TAG_NULL: &str = "!!null";
pub(crate) const TAG_NULL_SHORTHAND: &str = "!null";
pub(crate) const TAG_NULL_CANONICAL: &str = "tag:yaml.org,2002:null";

pub(crate) const TAG_BINARY: &str = "!!binary";
pub(crate) const TAG_BINARY_SHORTHAND: &str = "!binary";
pub(crate) const TAG_BINARY_CANONICAL: &str = "tag:yaml.org,2002:binary";

pub(crate) const TAG_TIMESTAMP: &str = "!!timestamp";
pub(crate) const TAG_TIMESTAMP_SHORTHAND: &str = "!timestamp";
pub(crate) const TAG_TIMESTAMP_CANONICAL: &str = "tag:yaml.org,2002:timestamp";

pub(crate) const TAG_MERGE: &str = "!!merge";
pub(crate) const TAG_MERGE_CANONICAL: &str = "tag:yaml.org,2002:merge";

/// Tags that pin a scalar to a non-string core schema type.
pub(crate) const NON_STRING_TAGS: &[&str] = &[
    TAG_INT,
    TAG_INT_SHORTHAND,
    TAG_INT_CANONICAL,
    TAG_FLOAT,
    TAG_FLOAT_SHORTHAND,
    TAG_FLOAT_CANONICAL,
    TAG_BOOL,
    TAG_BOOL_SHORTHAND,
    TAG_BOOL_CANONICAL,
    TAG_NULL,
    TAG_NULL_SHORTHAND,
    TAG_NULL_CANONICAL,
    TAG_TIMESTAMP,
    TAG_TIMESTAMP_SHORTHAND,
    TAG_TIMESTAMP_CANONICAL,
];

/// False when the tag explicitly says the scalar is a number, bool, null or timestamp.
pub(crate) fn can_parse_into_string(tag: Option<&str>) -> bool {
    match tag {
        None => true,
        Some(t) => !NON_STRING_TAGS.contains(&t),
    }
}

pub(crate) fn is_null_tag(tag: Option<&str>) -> bool {
    matches!(
        tag,
        Some(TAG_NULL | TAG_NULL_SHORTHAND | TAG_NULL_CANONICAL)
    )
}

pub(crate) fn is_str_tag(tag: Option<&str>) -> bool {
    matches!(tag, Some(TAG_STR | TAG_STR_SHORTHAND | TAG_STR_CANONICAL))
}

pub(crate) fn is_merge_tag(tag: Option<&str>) -> bool {
    matches!(tag, Some(TAG_MERGE | TAG_MERGE_CANONICAL))
}

pub(crate) fn is_binary_tag(tag: Option<&str>) -> bool {
    matches!(
        tag,
        Some(TAG_BINARY | TAG_BINARY_SHORTHAND | TAG_BINARY_CANONICAL)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_compatibility() {
        assert!(can_parse_into_string(None));
        assert!(can_parse_into_string(Some("!!str")));
        assert!(can_parse_into_string(Some("!custom")));
        assert!(!can_parse_into_string(Some("!!int")));
        assert!(!can_parse_into_string(Some("tag:yaml.org,2002:bool")));
    }

    #[test]
    fn tag_families() {
        assert!(is_null_tag(Some("!!null")));
        assert!(!is_null_tag(None));
        assert!(is_str_tag(Some("tag:yaml.org,2002:str")));
        assert!(is_binary_tag(Some("!binary")));
        assert!(!is_binary_tag(Some("!!str")));
        assert!(is_merge_tag(Some("tag:yaml.org,2002:merge")));
        assert!(!is_merge_tag(None));
    }
}
