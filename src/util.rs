//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Drop a `data:<mime>;base64,` prefix if the client sent a data URL.
pub fn strip_data_url_prefix(data: &str) -> &str {
  match data.find(";base64,") {
    Some(idx) => &data[idx + ";base64,".len()..],
    None => data,
  }
}

/// Log-safe truncation for large strings (cuts on char boundaries).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}
