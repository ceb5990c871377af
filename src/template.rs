//! HTML templates for the screens. Every `&str` argument is inserted verbatim, so
//! callers escape anything that did not come from the markdown renderer.

pub const NSFW_BADGE: &str = r#" <span class="label label-important nsfw">nsfw</span>"#;

pub const ICON_EXPANDED: &str = "icon-angle-down";
pub const ICON_COLLAPSED: &str = "icon-angle-right";

const TAB_ICON: &str = "img/icons/ic_view_list.png";

const STYLESHEET: &str = r#"
      body { margin: 0; font-family: "Slate Pro", "Helvetica Neue", sans-serif; background: #f4f4f4; color: #262626; }
      .action-bar { display: flex; overflow-x: auto; background: #262626; }
      .action-bar [data-bb-type="action"] { padding: 0.6rem 1rem; color: #fafafa; white-space: nowrap; }
      .action-bar [data-bb-selected="true"] { border-bottom: 3px solid #00a8df; }
      .link { background: #fff; margin: 0.4rem; padding: 0.6rem; border-radius: 4px; }
      .link .thumbnail { float: left; margin-right: 0.6rem; }
      .link-meta, .comment-header { color: #7a7a7a; font-size: 0.85rem; }
      .comments .badge { background: #00a8df; color: #fff; border-radius: 8px; padding: 0 0.4rem; }
      .nsfw { background: #b94a48; color: #fff; padding: 0 0.3rem; }
      .comment, .reply { margin: 0.4rem 0 0.4rem 0.6rem; border-left: 2px solid #dedede; padding-left: 0.6rem; }
      .op { color: #0055df; font-weight: bold; }
      #loading { padding: 1rem; text-align: center; }
"#;

// Mirrors `CommentTree::toggle` for pages opened in a browser.
const TOGGLE_SCRIPT: &str = r#"
      document.addEventListener("click", function (event) {
        var header = event.target.closest(".comment-header");
        if (!header || event.target.closest(".reply")) { return; }
        var content = header.nextElementSibling;
        var icon = header.querySelector("i");
        var hidden = content.style.display === "none";
        content.style.display = hidden ? "" : "none";
        icon.className = hidden ? "icon-angle-down" : "icon-angle-right";
      });
"#;

pub struct LinkView<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub subreddit: &'a str,
    pub score: i64,
    pub domain: &'a str,
    pub time: &'a str,
    pub author: &'a str,
}

pub fn link(view: &LinkView<'_>) -> String {
    format!(
        r#"<div class="link" id="{name}">
  {description}
  <div class="link-meta">
    <span class="score">{score}</span>
    <span class="subreddit">{subreddit}</span>
    <span class="domain">({domain})</span>
    <span class="time">{time}</span> by <span class="author">{author}</span>
  </div>
</div>"#,
        name = view.name,
        description = view.description,
        score = view.score,
        subreddit = view.subreddit,
        domain = view.domain,
        time = view.time,
        author = view.author,
    )
}

pub fn title_without_thumbnail(title: &str, num_comments: i64) -> String {
    format!(
        r#"<div class="link-title">{title}</div>
  <div class="comments"><span class="badge">{num_comments}</span> comments</div>"#
    )
}

pub fn title_with_thumbnail(title: &str, num_comments: i64, thumbnail: &str) -> String {
    format!(
        r#"<div class="thumbnail"><img src="{thumbnail}" alt="" /></div>
  {}"#,
        title_without_thumbnail(title, num_comments)
    )
}

pub struct CommentView<'a> {
    pub name: &'a str,
    pub class: &'a str,
    pub author: &'a str,
    pub score: &'a str,
    pub time: &'a str,
    pub body: &'a str,
    pub collapsed: bool,
    pub replies: &'a str,
}

pub fn comment(view: &CommentView<'_>) -> String {
    let (icon, hidden) = if view.collapsed {
        (ICON_COLLAPSED, r#" style="display: none""#)
    } else {
        (ICON_EXPANDED, "")
    };
    format!(
        r#"<div id="{name}" class="{class}">
<div class="comment-header" data-toggle="{name}"><i class="{icon}"></i> <span class="author">{author}</span> <span class="score">{score}</span> <span class="time">{time}</span> <a class="reply">reply</a></div>
<div class="comment-content"{hidden}>
<div class="comment-body">{body}</div>
{replies}</div>
</div>
"#,
        name = view.name,
        class = view.class,
        icon = icon,
        author = view.author,
        score = view.score,
        time = view.time,
        hidden = hidden,
        body = view.body,
        replies = view.replies,
    )
}

pub fn link_header(name: &str, title: &str, domain: &str, num_comments: i64) -> String {
    format!(
        r#"<div id="linkHeader" data-link="{name}">
  <h3 class="link-title">{title}</h3>
  <span class="domain">{domain}</span>
  <span class="comments">{num_comments} comments</span>
  <a class="reply">reply</a>
</div>"#
    )
}

pub fn tab(id: &str, label: &str, selected: bool) -> String {
    format!(
        r#"<div data-bb-type="action" data-bb-style="tab" data-bb-overflow="true" data-bb-img="{TAB_ICON}" data-bb-selected="{selected}" id="{id}">{label}</div>"#
    )
}

pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>{STYLESHEET}    </style>
  </head>
  <body>
{body}
    <script>{TOGGLE_SCRIPT}    </script>
  </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_wires_comment_toggles() {
        let html = page("Thread", "<div id=\"comments\"></div>");
        assert!(html.contains("<title>Thread</title>"));
        assert!(html.contains(r#"closest(".comment-header")"#));
        assert!(html.contains(ICON_EXPANDED));
        assert!(html.contains(ICON_COLLAPSED));
        assert!(html.find("<script>") > html.find(r#"<div id="comments">"#));
    }

    #[test]
    fn collapsed_comment_hides_content() {
        let html = comment(&CommentView {
            name: "t1_a",
            class: "comment",
            author: "bob",
            score: "-5",
            time: "a day ago",
            body: "<p>meh</p>",
            collapsed: true,
            replies: "",
        });
        assert!(html.contains(ICON_COLLAPSED));
        assert!(html.contains(r#"class="comment-content" style="display: none""#));
    }

    #[test]
    fn thumbnail_variant_wraps_plain_title() {
        let html = title_with_thumbnail("A title", 3, "http://t.example/x.jpg");
        assert!(html.contains(r#"<img src="http://t.example/x.jpg""#));
        assert!(html.contains(r#"<span class="badge">3</span>"#));
    }
}
