//! `{{placeholder}}` substitution for content and filename templates.

/// Values for every placeholder of the content template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateData {
    pub title: String,
    pub link: String,
    pub author: String,
    pub published_time: String,
    pub saved_time: String,
    pub image: String,
    pub description: String,
    pub description_short: String,
    pub tags: String,
    pub content: String,
}

impl TemplateData {
    fn lookup(&self, token: &str) -> Option<&str> {
        let value = match token {
            "title" => &self.title,
            "link" => &self.link,
            "author" => &self.author,
            "publishedTime" => &self.published_time,
            "savedTime" => &self.saved_time,
            "image" => &self.image,
            "description" => &self.description,
            "descriptionShort" => &self.description_short,
            "#tags" => &self.tags,
            "content" => &self.content,
            _ => return None,
        };
        Some(value.as_str())
    }
}

const IMAGE_TOKEN: &str = "{{image}}";

/// Drops every line mentioning `{{image}}` when there is no image.
///
/// The whole line goes, including its line break, so an image block in a
/// template disappears without leaving a blank reference behind.
pub fn prepare(template: &str, has_image: bool) -> String {
    if has_image {
        return template.to_string();
    }
    template
        .split_inclusive('\n')
        .filter(|line| !line.contains(IMAGE_TOKEN))
        .collect()
}

/// Fills the content template. Unknown placeholders are left as written.
pub fn render(template: &str, data: &TemplateData) -> String {
    substitute(template, |token| data.lookup(token))
}

/// Fills the filename template (`{{title}}`, `{{published}}`).
pub fn render_file_name(template: &str, title: &str, published: &str) -> String {
    substitute(template, |token| match token {
        "title" => Some(title),
        "published" => Some(published),
        _ => None,
    })
}

/// Single left-to-right pass over the template. Substituted values are
/// copied to the output and never scanned again, so a title containing
/// `{{content}}` stays literal.
fn substitute<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let replaced = after_open.find("}}").and_then(|end| {
            lookup(&after_open[..end]).map(|value| (value, end))
        });
        match replaced {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after_open[end + 2..];
            }
            None => {
                // Step one brace so `{{{name}}` still finds `{{name}}`
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
