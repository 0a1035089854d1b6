//! Desktop entry rendering

use weblet_core::paths::instance_id;
use weblet_core::types::WebApp;

/// Map a webapp category to freedesktop menu categories. Unknown or
/// missing categories land in the generic browser bucket.
pub fn menu_categories(category: Option<&str>) -> &'static str {
    match category {
        Some("social") => "Network;Chat;",
        Some("messaging") => "Network;InstantMessaging;",
        Some("productivity") => "Office;Productivity;",
        Some("entertainment") => "AudioVideo;Video;",
        Some("news") => "News;",
        Some("development") => "Development;",
        Some("finance") => "Finance;",
        _ => "Network;WebBrowser;",
    }
}

/// Render the `.desktop` file for a webapp.
///
/// `exec` is the absolute path of the manager binary; the entry always
/// launches through it so the webapp opens with its own profile and
/// window class. Values are kept on one line since the Name and URL
/// have already been validated.
pub fn render(webapp: &WebApp, exec: &str, icon: &str) -> String {
    let id = instance_id(&webapp.id);
    let name = single_line(&webapp.name);

    format!(
        "[Desktop Entry]\n\
         Version=1.0\n\
         Type=Application\n\
         Name={name}\n\
         Comment={name} web application\n\
         Exec={exec} --webapp {webapp_id}\n\
         Icon={icon}\n\
         Terminal=false\n\
         Categories={categories}\n\
         Keywords={name};webapp;\n\
         StartupNotify=true\n\
         StartupWMClass={id}\n\
         Actions=NewWindow;Preferences;\n\
         \n\
         [Desktop Action NewWindow]\n\
         Name=New Window\n\
         Exec={exec} --webapp {webapp_id} --new-window\n\
         \n\
         [Desktop Action Preferences]\n\
         Name=Preferences\n\
         Exec={exec} --preferences {webapp_id}\n",
        webapp_id = webapp.id,
        categories = menu_categories(webapp.category.as_deref()),
    )
}

fn single_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use weblet_core::unix_now;

    fn webapp(category: Option<&str>) -> WebApp {
        WebApp {
            id: "abc-123".to_string(),
            name: "My Mail".to_string(),
            url: "https://mail.example.com/".to_string(),
            icon_path: None,
            category: category.map(String::from),
            created_at: unix_now(),
            last_opened: None,
            open_count: 0,
        }
    }

    #[test]
    fn test_entry_contains_identity_and_exec() {
        let entry = render(&webapp(None), "/usr/bin/weblet", "weblet");
        assert!(entry.contains("Name=My Mail\n"));
        assert!(entry.contains("Exec=/usr/bin/weblet --webapp abc-123\n"));
        assert!(entry.contains(&format!(
            "StartupWMClass={}\n",
            instance_id("abc-123")
        )));
        assert!(entry.contains("Actions=NewWindow;Preferences;\n"));
        assert!(entry.contains("[Desktop Action Preferences]"));
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(menu_categories(Some("social")), "Network;Chat;");
        assert_eq!(menu_categories(Some("finance")), "Finance;");
        assert_eq!(menu_categories(Some("bogus")), "Network;WebBrowser;");
        assert_eq!(menu_categories(None), "Network;WebBrowser;");

        let entry = render(&webapp(Some("development")), "/usr/bin/weblet", "weblet");
        assert!(entry.contains("Categories=Development;\n"));
    }

    #[test]
    fn test_newlines_in_name_are_flattened() {
        let mut app = webapp(None);
        app.name = "Bad\nName".to_string();
        let entry = render(&app, "/usr/bin/weblet", "weblet");
        assert!(entry.contains("Name=Bad Name\n"));
    }
}
