// Page rendering shared by the login and profile handlers
use crate::gate::ProfileView;
use crate::settings::AuthgateSettings;

const ERROR_PLACEHOLDER: &str = "{{error}}";
const RD_PLACEHOLDER: &str = "{{rd}}";

/// Login page HTML
///
/// Uses `login.html` from the assets folder when present, substituting the
/// `{{error}}` and `{{rd}}` placeholders; otherwise generates the page.
#[must_use]
pub fn get_login_page(settings: &AuthgateSettings, error: Option<&str>, rd: Option<&str>) -> String {
    let html_path = format!("{}/login.html", settings.static_files.assets_folder);
    std::fs::read_to_string(&html_path).map_or_else(
        |_| generate_dynamic_login_page(error, rd),
        |template| {
            template
                .replace(ERROR_PLACEHOLDER, &escape_html(error.unwrap_or_default()))
                .replace(RD_PLACEHOLDER, &escape_html(rd.unwrap_or_default()))
        },
    )
}

#[must_use]
pub fn generate_dynamic_login_page(error: Option<&str>, rd: Option<&str>) -> String {
    let error_banner = error
        .filter(|message| !message.is_empty())
        .map(|message| format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    let rd_field = rd
        .filter(|target| !target.is_empty())
        .map(|target| {
            format!(
                r#"<input type="hidden" name="rd" value="{}">"#,
                escape_html(target)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sign In</title>
    <style>{styles}</style>
</head>
<body>
    <div class="container">
        <h1>Sign In</h1>
        {error_banner}
        <form method="post" action="/auth/sign_in">
            {rd_field}
            <input type="email" name="email" placeholder="Email" required>
            <input type="password" name="password" placeholder="Password" required>
            <button type="submit">Sign in</button>
            <button type="submit" formaction="/auth/sign_up" class="secondary">Create account</button>
        </form>
    </div>
</body>
</html>"#,
        styles = page_styles(),
    )
}

/// Profile page for a signed-in user, with the logout form
#[must_use]
pub fn render_profile_page(view: &ProfileView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Profile</title>
    <style>{styles}</style>
</head>
<body>
    <div class="container">
        <h1>Profile</h1>
        <p>Signed in as <strong class="email">{email}</strong></p>
        <p class="uid">{uid}</p>
        <form method="post" action="{logout}">
            <button type="submit">Sign out</button>
        </form>
    </div>
</body>
</html>"#,
        styles = page_styles(),
        email = escape_html(&view.user.email),
        uid = escape_html(&view.user.uid),
        logout = escape_html(&view.logout_action),
    )
}

/// Escape text for use in HTML element content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const fn page_styles() -> &'static str {
    r"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #f5f7fa 0%, #c3cfe2 100%);
            min-height: 100vh;
            margin: 0;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .container {
            background: white;
            padding: 40px;
            border-radius: 10px;
            box-shadow: 0 14px 28px rgba(0,0,0,0.12);
            max-width: 360px;
            width: 100%;
        }
        h1 { color: #333; text-align: center; }
        form { display: flex; flex-direction: column; gap: 12px; }
        input { padding: 10px; border: 1px solid #ccc; border-radius: 6px; }
        button { padding: 10px; border: none; border-radius: 6px; background: #4285f4; color: white; }
        button.secondary { background: #666; }
        .error { color: #b00020; text-align: center; }
        .uid { color: #888; font-size: 12px; }
    "
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_login_page_shows_escaped_error() {
        let page = generate_dynamic_login_page(Some("<b>EMAIL_EXISTS</b>"), None);
        assert!(page.contains("&lt;b&gt;EMAIL_EXISTS&lt;/b&gt;"));
        assert!(!page.contains("<b>EMAIL_EXISTS</b>"));
    }

    #[test]
    fn test_login_page_without_error_has_no_banner() {
        let page = generate_dynamic_login_page(None, None);
        assert!(!page.contains("role=\"alert\""));
        assert!(page.contains("action=\"/auth/sign_in\""));
    }

    #[test]
    fn test_login_page_carries_redirect_target() {
        let page = generate_dynamic_login_page(None, Some("/settings"));
        assert!(page.contains(r#"name="rd" value="/settings""#));
    }

    #[test]
    fn test_profile_page_has_logout_form() {
        let view = ProfileView {
            user: User::new("uid-1", "ada@example.com"),
            logout_action: "/auth/sign_out".to_string(),
        };
        let page = render_profile_page(&view);
        assert!(page.contains("ada@example.com"));
        assert!(page.contains(r#"action="/auth/sign_out""#));
    }
}
