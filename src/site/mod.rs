//! Server-rendered marketing pages: home, about, services, contact.
//!
//! The single-page portal front-end is served separately from embedded
//! assets (see `embedded`).

pub mod embedded;

use axum::{
    extract::State,
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::shared::state::AppState;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn nav_link(href: &str, label: &str, active: &str) -> String {
    let class = if label == active {
        "nav-link active"
    } else {
        "nav-link"
    };
    format!("<a class=\"{class}\" href=\"{href}\">{label}</a>")
}

fn layout(site: &SiteConfig, title: &str, active: &str, body: &str) -> String {
    let name = html_escape(&site.name);
    format!(
        "<!DOCTYPE html>\
        <html lang=\"en\">\
        <head>\
            <meta charset=\"utf-8\">\
            <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
            <title>{title} | {name}</title>\
            <link rel=\"stylesheet\" href=\"/portal/styles.css\">\
        </head>\
        <body>\
            <header class=\"site-header\">\
                <span class=\"brand\">{name}</span>\
                <nav class=\"site-nav\">{home}{about}{services}{contact}{portal}</nav>\
            </header>\
            <main class=\"site-main\">{body}</main>\
            <footer class=\"site-footer\">&copy; {name}</footer>\
        </body>\
        </html>",
        title = html_escape(title),
        name = name,
        home = nav_link("/", "Home", active),
        about = nav_link("/about", "About", active),
        services = nav_link("/services", "Services", active),
        contact = nav_link("/contact", "Contact", active),
        portal = nav_link("/portal", "Customer Portal", active),
        body = body,
    )
}

pub fn render_home(site: &SiteConfig) -> String {
    let body = format!(
        "<section class=\"hero\">\
            <h1>{name}</h1>\
            <p>On-site and remote technical support for small businesses.</p>\
            <a class=\"btn btn-primary\" href=\"/contact\">Get in touch</a>\
        </section>\
        <section class=\"highlights\">\
            <div class=\"highlight\"><h3>Fast response</h3><p>Most requests answered the same business day.</p></div>\
            <div class=\"highlight\"><h3>Flat pricing</h3><p>No surprises; quotes up front for every job.</p></div>\
            <div class=\"highlight\"><h3>Local team</h3><p>Technicians who know your setup and your area.</p></div>\
        </section>",
        name = html_escape(&site.name),
    );
    layout(site, "Home", "Home", &body)
}

pub fn render_about(site: &SiteConfig) -> String {
    let body = "<section class=\"page\">\
        <h1>About us</h1>\
        <p>We are a small crew of technicians and engineers who keep local \
        businesses online: networks, workstations, point-of-sale systems and \
        the software that ties them together.</p>\
        <p>Every job gets a named technician, a written summary, and a \
        follow-up. No call centers, no runaround.</p>\
    </section>";
    layout(site, "About", "About", body)
}

pub fn render_services(site: &SiteConfig) -> String {
    let body = "<section class=\"page\">\
        <h1>Services</h1>\
        <ul class=\"service-list\">\
            <li><h3>Network setup &amp; repair</h3><p>Wired and wireless, from a single office to multi-site.</p></li>\
            <li><h3>Workstation support</h3><p>Diagnosis, upgrades, and scheduled maintenance.</p></li>\
            <li><h3>Data backup &amp; recovery</h3><p>Automated off-site backup with tested restores.</p></li>\
            <li><h3>Security reviews</h3><p>Practical hardening for small-business budgets.</p></li>\
        </ul>\
    </section>";
    layout(site, "Services", "Services", body)
}

// Submits the form as JSON, with the portal session token when one exists so
// signed-in customers get a ticket opened.
const CONTACT_SCRIPT: &str = "<script>\
(function () {\
  var form = document.getElementById('contact-form');\
  var note = document.getElementById('notification');\
  function notify(message, isError) {\
    note.textContent = message;\
    note.className = 'notification' + (isError ? ' error' : '');\
    clearTimeout(note._timer);\
    note._timer = setTimeout(function () { note.className = 'notification hidden'; }, 6000);\
  }\
  form.addEventListener('submit', function (e) {\
    e.preventDefault();\
    var data = new FormData(form);\
    var headers = { 'Content-Type': 'application/json' };\
    var token = sessionStorage.getItem('portal_token');\
    if (token) headers['Authorization'] = 'Bearer ' + token;\
    fetch(form.action, {\
      method: 'POST',\
      headers: headers,\
      body: JSON.stringify({\
        name: data.get('name'),\
        email: data.get('email'),\
        phone: data.get('phone') || null,\
        message: data.get('message'),\
        priority: data.get('priority')\
      })\
    }).then(function (res) { return res.json(); }).then(function (data) {\
      if (!data.success) throw new Error(data.error || 'Request failed');\
      form.reset();\
      if (data.ticket) {\
        notify('Thanks! Service ticket ' + data.ticket.ticket_number + ' has been opened.');\
      } else if (data.signup_prompt) {\
        notify('Thanks! Create a portal account to track your request as a ticket.');\
      } else {\
        notify('Thanks! We will be in touch.');\
      }\
    }).catch(function (err) { notify(err.message, true); });\
  });\
})();\
</script>";

pub fn render_contact(site: &SiteConfig) -> String {
    let body = format!(
        "<div id=\"notification\" class=\"notification hidden\"></div>\
        <section class=\"page\">\
            <h1>Contact</h1>\
            <p>Email us at <a href=\"mailto:{email}\">{email}</a> or send a message below. \
            Signed-in customers get a service ticket opened automatically.</p>\
            <form id=\"contact-form\" method=\"post\" action=\"/api/contact\">\
                <label>Name <input type=\"text\" name=\"name\" required></label>\
                <label>Email <input type=\"email\" name=\"email\" required></label>\
                <label>Phone <input type=\"tel\" name=\"phone\"></label>\
                <label>Priority \
                    <select name=\"priority\">\
                        <option value=\"low\">Low</option>\
                        <option value=\"normal\" selected>Normal</option>\
                        <option value=\"high\">High</option>\
                    </select>\
                </label>\
                <label>Message <textarea name=\"message\" required></textarea></label>\
                <button type=\"submit\" class=\"btn btn-primary\">Send</button>\
            </form>\
        </section>{script}",
        email = html_escape(&site.contact_email),
        script = CONTACT_SCRIPT,
    );
    layout(site, "Contact", "Contact", &body)
}

async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_home(&state.config.site))
}

async fn about(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_about(&state.config.site))
}

async fn services(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_services(&state.config.site))
}

async fn contact(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_contact(&state.config.site))
}

pub fn configure_site_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/services", get(services))
        .route("/contact", get(contact))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_site() -> SiteConfig {
        SiteConfig {
            name: "Northwire Technical Services".to_string(),
            contact_email: "hello@northwire.example".to_string(),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<b>\"a&b's\"</b>"),
            "&lt;b&gt;&quot;a&amp;b&#x27;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_pages_share_nav() {
        let site = test_site();
        for page in [
            render_home(&site),
            render_about(&site),
            render_services(&site),
            render_contact(&site),
        ] {
            assert!(page.contains("href=\"/about\""));
            assert!(page.contains("href=\"/services\""));
            assert!(page.contains("href=\"/contact\""));
            assert!(page.contains("href=\"/portal\""));
            assert!(page.contains("Northwire Technical Services"));
        }
    }

    #[test]
    fn test_contact_page_posts_to_api() {
        let page = render_contact(&test_site());
        assert!(page.contains("action=\"/api/contact\""));
        assert!(page.contains("value=\"normal\" selected"));
        // Submission goes through the script so the portal token rides along.
        assert!(page.contains("sessionStorage.getItem('portal_token')"));
        assert!(page.contains("signup_prompt"));
    }

    #[test]
    fn test_active_nav_marked() {
        let page = render_services(&test_site());
        assert!(page.contains("<a class=\"nav-link active\" href=\"/services\">Services</a>"));
    }
}
