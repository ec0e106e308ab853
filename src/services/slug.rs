/// Lowercases `input`, drops everything outside `[a-z0-9 -]`, turns runs of
/// whitespace into `-`, collapses repeated `-` and trims them from both ends.
/// May return an empty string; callers treat that as an invalid name.
pub fn sanitize_slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());

    for ch in lowered.chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => ch,
            '-' => '-',
            c if c.is_whitespace() => '-',
            _ => continue,
        };
        if mapped == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(mapped);
    }

    slug.trim_matches('-').to_string()
}
