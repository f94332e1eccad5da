//! Server-rendered HTML pages.

use std::fmt::Write;

use axum::http::StatusCode;

use crate::models::user::DESCRIPTION_MAX_CHARS;
use crate::models::{Business, Category, EventListing, User};

static LAYOUT_HTML: &str = include_str!("web/layout.html");

pub const NO_EVENTS_MESSAGE: &str = "<p>Oops! There are currently no events available :'(</p>\n";

/// Escapes text for use in element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Substitutes `{{key}}` markers in one pass so inserted text is never
/// re-scanned.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Wraps page content in the site layout.
pub struct Page<'a> {
    pub title: &'a str,
    pub user_id: Option<i64>,
    pub flash: Option<&'a str>,
}

impl<'a> Page<'a> {
    pub fn new(title: &'a str, user_id: Option<i64>) -> Self {
        Self {
            title,
            user_id,
            flash: None,
        }
    }

    pub fn flash(mut self, flash: Option<&'a str>) -> Self {
        self.flash = flash;
        self
    }

    pub fn render(&self, content: &str) -> String {
        let nav = match self.user_id {
            Some(id) => format!(
                "<a href=\"/\">Home</a>\
                 <a href=\"/create_event\">Create an event</a>\
                 <a href=\"/find_events\">Find events</a>\
                 <a href=\"/upcoming_events\">Upcoming events</a>\
                 <a href=\"/profile/{id}\">Profile</a>\
                 <a href=\"/logout\">Log out</a>"
            ),
            None => "<a href=\"/\">Home</a>\
                     <a href=\"/login\">Log in</a>\
                     <a href=\"/signup\">Sign up</a>"
                .to_string(),
        };
        let flash = self
            .flash
            .map(|m| format!("<div class=\"flash\">{}</div>", escape(m)))
            .unwrap_or_default();

        let title = escape(self.title);

        fill(
            LAYOUT_HTML,
            &[
                ("title", title.as_str()),
                ("nav", nav.as_str()),
                ("flash", flash.as_str()),
                ("content", content),
            ],
        )
    }
}

fn error_line(message: Option<&str>) -> String {
    message
        .map(|m| format!("<p class=\"error\">{}</p>\n", escape(m)))
        .unwrap_or_default()
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    Page::new(status.canonical_reason().unwrap_or("Error"), None).render(&format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to the homepage</a></p>\n",
        status.as_u16(),
        escape(message)
    ))
}

pub fn home(user: Option<&User>, flash: Option<&str>) -> String {
    let content = match user {
        Some(user) => format!(
            "<h1>Fork&Spoon</h1>\n\
             <p>Hi {}, hungry? Pick a restaurant and a time, and we'll find you a dining partner.</p>\n\
             <p><a href=\"/create_event\">Create an event</a> or <a href=\"/find_events\">join one</a>.</p>\n",
            escape(&user.first_name)
        ),
        None => "<h1>Fork&Spoon</h1>\n\
                 <p>Never eat alone. Propose a meal at a restaurant you love and get matched with someone who wants to join.</p>\n\
                 <p><a href=\"/signup\">Sign up</a> or <a href=\"/login\">log in</a>.</p>\n"
            .to_string(),
    };
    Page::new("Home", user.map(|u| u.id)).flash(flash).render(&content)
}

pub fn login_page(message: Option<&str>, flash: Option<&str>) -> String {
    let content = format!(
        "<h1>Log in</h1>\n{}\
         <form action=\"/login\" method=\"post\">\n\
           <label>Email <input type=\"email\" name=\"email\" required></label>\n\
           <label>Password <input type=\"password\" name=\"password\" required></label>\n\
           <button type=\"submit\">Log in</button>\n\
         </form>\n\
         <p>New here? <a href=\"/signup\">Sign up</a></p>\n",
        error_line(message)
    );
    Page::new("Log in", None).flash(flash).render(&content)
}

pub fn phone_page(message: Option<&str>) -> String {
    let content = format!(
        "<h1>Verify your phone</h1>\n{}\
         <p>We'll text you a code to confirm your number.</p>\n\
         <form action=\"/submit_phone\" method=\"post\">\n\
           <label>Phone number <input type=\"tel\" name=\"phone_number\" required></label>\n\
           <button type=\"submit\">Send code</button>\n\
         </form>\n",
        error_line(message)
    );
    Page::new("Sign up", None).render(&content)
}

pub fn code_page(phone: &str, message: Option<&str>) -> String {
    let content = format!(
        "<h1>Enter verification code</h1>\n{}\
         <p>We sent a code to {phone}.</p>\n\
         <form action=\"/submit_confirmation_code\" method=\"post\">\n\
           <input type=\"hidden\" name=\"phone_number\" value=\"{phone}\">\n\
           <label>Code <input type=\"text\" name=\"verification_code\" inputmode=\"numeric\" required></label>\n\
           <button type=\"submit\">Verify</button>\n\
         </form>\n",
        error_line(message),
        phone = escape(phone),
    );
    Page::new("Verify", None).render(&content)
}

pub fn signup_form(phone: &str, message: Option<&str>) -> String {
    let content = format!(
        "<h1>Sign Up</h1>\n{}\
         <form action=\"/signup\" method=\"post\">\n\
           <input type=\"hidden\" name=\"phone_number\" value=\"{}\">\n\
           <label>First name <input type=\"text\" name=\"first_name\" required></label>\n\
           <label>Last name <input type=\"text\" name=\"last_name\" required></label>\n\
           <label>Email <input type=\"email\" name=\"email\" required></label>\n\
           <label>Password <input type=\"password\" name=\"password\" required></label>\n\
           <button type=\"submit\">Sign Up</button>\n\
         </form>\n",
        error_line(message),
        escape(phone),
    );
    Page::new("Sign up", None).render(&content)
}

fn category_options(categories: &[Category]) -> String {
    let mut out = String::new();
    for category in categories {
        let _ = writeln!(
            out,
            "<option value=\"{}\">{}</option>",
            escape(&category.title),
            escape(&category.title)
        );
    }
    out
}

pub fn create_event_page(user_id: i64, categories: &[Category], cities: &[String]) -> String {
    let mut city_options = String::new();
    for city in cities {
        let _ = writeln!(city_options, "<option value=\"{0}\">{0}</option>", escape(city));
    }

    let content = format!(
        "<h1>Create an event</h1>\n\
         <form action=\"/restaurant_query\" method=\"post\">\n\
           <label>City <input type=\"text\" name=\"city\" list=\"cities\"></label>\n\
           <datalist id=\"cities\">\n{city_options}</datalist>\n\
           <label>or zipcode <input type=\"text\" name=\"zipcode\"></label>\n\
           <label>Cuisine <input type=\"text\" name=\"term\" list=\"categories\"></label>\n\
           <datalist id=\"categories\">\n{}</datalist>\n\
           <label>Within (miles) <input type=\"number\" name=\"distance\" step=\"any\" min=\"0\" value=\"5\"></label>\n\
           <button type=\"submit\">Search restaurants</button>\n\
         </form>\n",
        category_options(categories)
    );
    Page::new("Create an event", Some(user_id)).render(&content)
}

pub fn search_results(
    user_id: i64,
    businesses: &[Business],
    categories: &[Category],
    term: &str,
    location: &str,
) -> String {
    let mut content = format!(
        "<h1>Restaurants for \"{}\" near {}</h1>\n",
        escape(term),
        escape(location)
    );

    if businesses.is_empty() {
        content.push_str("<p>No restaurants matched your search. Try a wider distance.</p>\n");
    }

    let mut category_select = String::from("<option value=\"\">Any</option>\n");
    for category in categories {
        let _ = writeln!(
            category_select,
            "<option value=\"{}\">{}</option>",
            category.id,
            escape(&category.title)
        );
    }

    for business in businesses {
        let rating = business
            .rating
            .map(|r| format!("{r:.1} stars, "))
            .unwrap_or_default();
        let _ = write!(
            content,
            "<div class=\"card\">\n\
               <h2><a href=\"{url}\">{name}</a></h2>\n\
               <p>{categories}</p>\n\
               <p>{rating}{reviews} reviews</p>\n\
               <p>{address}</p>\n\
               <form action=\"/confirmation\" method=\"post\">\n\
                 <input type=\"hidden\" name=\"business_url\" value=\"{url}\">\n\
                 <label>Date <input type=\"date\" name=\"date\" required></label>\n\
                 <label>From <input type=\"time\" name=\"start_time\" required></label>\n\
                 <label>To <input type=\"time\" name=\"end_time\" required></label>\n\
                 <label>Category <select name=\"category_id\">\n{category_select}</select></label>\n\
                 <button type=\"submit\">Propose a meal here</button>\n\
               </form>\n\
             </div>\n",
            url = escape(&business.url),
            name = escape(&business.name),
            categories = escape(&business.categories),
            reviews = business.review_count,
            address = escape(&business.address),
        );
    }

    Page::new("Restaurants", Some(user_id)).render(&content)
}

pub fn event_form_error(user_id: i64, message: &str) -> String {
    let content = format!(
        "<h1>Create an event</h1>\n{}<p><a href=\"/create_event\">Start a new search</a></p>\n",
        error_line(Some(message))
    );
    Page::new("Create an event", Some(user_id)).render(&content)
}

pub fn confirmation_page(user_id: i64, business: &Business, date: &str, start: &str, end: &str) -> String {
    let content = format!(
        "<h1>Thanks for creating an event!</h1>\n\
         <p>{} on {} from {} to {}.</p>\n\
         <p>We'll text you when someone joins. <a href=\"/upcoming_events\">See your upcoming events</a></p>\n",
        escape(&business.name),
        escape(date),
        escape(start),
        escape(end),
    );
    Page::new("Event created", Some(user_id)).render(&content)
}

fn listing_summary(listing: &EventListing) -> String {
    let event = &listing.event;
    let category = listing
        .category
        .as_deref()
        .map(|c| format!(" ({})", escape(c)))
        .unwrap_or_default();
    format!(
        "<h2><a href=\"{}\">{}</a>{category}</h2>\n\
         <p>{}</p>\n\
         <p>{} from {} to {}</p>\n",
        escape(&listing.business_url),
        escape(&listing.business_name),
        escape(&listing.business_address),
        event.date.format("%A, %B %-d, %Y"),
        event.start_time.format("%H:%M"),
        event.end_time.format("%H:%M"),
    )
}

pub fn find_events_page(user_id: i64, listings: &[EventListing], message: Option<&str>) -> String {
    let mut content = format!("<h1>Find events</h1>\n{}", error_line(message));

    if listings.is_empty() {
        content.push_str(NO_EVENTS_MESSAGE);
    }

    for listing in listings {
        let _ = write!(
            content,
            "<div class=\"card\">\n{}\
               <p>Hosted by <a href=\"/other_profile/{}\">{}</a></p>\n\
               <form action=\"/matched\" method=\"post\">\n\
                 <input type=\"hidden\" name=\"event_id\" value=\"{}\">\n\
                 <button type=\"submit\">Join</button>\n\
               </form>\n\
             </div>\n",
            listing_summary(listing),
            listing.event.creator_id,
            escape(&listing.creator_name),
            listing.event.id,
        );
    }

    Page::new("Find events", Some(user_id)).render(&content)
}

pub fn upcoming_events_page(user_id: i64, listings: &[EventListing], flash: Option<&str>) -> String {
    let mut content = String::from("<h1>Your upcoming meals</h1>\n");

    if listings.is_empty() {
        content.push_str(
            "<p>No plans yet. <a href=\"/create_event\">Create an event</a> or \
             <a href=\"/find_events\">find one to join</a>.</p>\n",
        );
    }

    for listing in listings {
        let event = &listing.event;
        let other_name = if event.creator_id == user_id {
            listing.partner_name.as_deref()
        } else {
            Some(listing.creator_name.as_str())
        };
        let with = match (event.other_participant(user_id), other_name) {
            (Some(id), Some(name)) => format!(
                "With <a href=\"/other_profile/{id}\">{}</a>",
                escape(name)
            ),
            _ => "Waiting for a match".to_string(),
        };
        let _ = write!(
            content,
            "<div class=\"card\">\n{}<p>{} &middot; {}</p>\n</div>\n",
            listing_summary(listing),
            event.status.as_str(),
            with,
        );
    }

    Page::new("Upcoming events", Some(user_id))
        .flash(flash)
        .render(&content)
}

pub fn own_profile(user: &User, message: Option<&str>, flash: Option<&str>) -> String {
    let content = format!(
        "<h1>{}</h1>\n\
         <p>{}</p>\n\
         <h2>About me</h2>\n{}\
         <form action=\"/profile-edit\" method=\"post\">\n\
           <textarea name=\"description\" rows=\"8\" cols=\"60\" maxlength=\"{max}\">{}</textarea>\n\
           <p><em>({max} characters max.)</em></p>\n\
           <button type=\"submit\">Save</button>\n\
         </form>\n",
        escape(&user.full_name()),
        escape(&user.email),
        error_line(message),
        escape(&user.description),
        max = DESCRIPTION_MAX_CHARS,
    );
    Page::new("Profile", Some(user.id)).flash(flash).render(&content)
}

pub fn other_profile(viewer_id: Option<i64>, user: &User) -> String {
    let about = if user.description.is_empty() {
        "<p>No description yet.</p>\n".to_string()
    } else {
        format!("<p>{}</p>\n", escape(&user.description))
    };
    let content = format!(
        "<h1>{}</h1>\n<h2>About</h2>\n{about}",
        escape(&user.public_name())
    );
    Page::new("Profile", viewer_id).render(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_fill_does_not_rescan_values() {
        let out = fill("{{a}}|{{b}}|{{missing}}", &[("a", "{{b}}"), ("b", "x")]);
        assert_eq!(out, "{{b}}|x|{{missing}}");
    }

    #[test]
    fn test_layout_keeps_brand() {
        let html = Page::new("Home", None).render("<p>hi</p>");
        assert!(html.contains("Fork&Spoon"));
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("/login"));
    }

    #[test]
    fn test_flash_is_escaped() {
        let html = Page::new("Home", Some(1)).flash(Some("<script>")).render("");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("/logout"));
    }

    #[test]
    fn test_empty_find_events() {
        let html = find_events_page(1, &[], None);
        assert!(html.contains(NO_EVENTS_MESSAGE));
    }

    fn listing(partner_id: Option<i64>) -> EventListing {
        use crate::models::{Event, EventStatus};
        use chrono::{NaiveDate, NaiveTime};

        EventListing {
            event: Event {
                id: 1,
                creator_id: 10,
                partner_id,
                business_id: 1,
                category_id: None,
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
                status: if partner_id.is_some() {
                    EventStatus::Matched
                } else {
                    EventStatus::Unmatched
                },
                created_at: chrono::Utc::now().naive_utc(),
            },
            business_name: "Good Eats".to_string(),
            business_url: "http://www.afakeurllink.com".to_string(),
            business_address: "Paris".to_string(),
            category: None,
            creator_name: "Joe B".to_string(),
            partner_name: partner_id.map(|_| "Gordon R".to_string()),
        }
    }

    #[test]
    fn test_upcoming_names_the_other_participant() {
        let matched = [listing(Some(20))];

        let as_creator = upcoming_events_page(10, &matched, None);
        assert!(as_creator.contains("With <a href=\"/other_profile/20\">Gordon R</a>"));

        let as_partner = upcoming_events_page(20, &matched, None);
        assert!(as_partner.contains("With <a href=\"/other_profile/10\">Joe B</a>"));

        let waiting = upcoming_events_page(10, &[listing(None)], None);
        assert!(waiting.contains("Waiting for a match"));
    }
}
