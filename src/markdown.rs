use crate::paper::PaperRecord;

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize user input for embedding in a Markdown heading.
/// Replaces newlines (which would break heading structure) with spaces.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Numbered paper list under a `# <source>: <query>` heading. Placeholder links such as
/// "No link available" are not URLs, so those titles are printed without a link.
pub(crate) fn format_papers(source: &str, query: &str, papers: &[PaperRecord]) -> String {
    let mut output = format!("# {source}: {}\n\n", sanitize_heading(query));

    if papers.is_empty() {
        output.push_str("(No papers found.)\n");
        return output;
    }

    for (i, paper) in papers.iter().enumerate() {
        let title = escape_md_link(&paper.title);
        if paper.link.starts_with("http://") || paper.link.starts_with("https://") {
            output.push_str(&format!(
                "{}. [{title}]({})\n",
                i + 1,
                escape_md_link(&paper.link)
            ));
        } else {
            output.push_str(&format!("{}. {title} ({})\n", i + 1, paper.link));
        }
        output.push_str(&format!("   {}\n\n", paper.summary));
    }

    output
}
