//! User-management table with an add/update dialog.

use fiber_core::{
    deps, use_effect, use_ref, use_state, Component, Element, Event, Props, SetState,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct User {
    pub id: i64,
    pub family_name: String,
    pub given_name: String,
    pub gender: String,
    pub phone: String,
}

impl User {
    fn new(id: i64, family_name: &str, given_name: &str, gender: &str, phone: &str) -> Self {
        Self {
            id,
            family_name: family_name.to_owned(),
            given_name: given_name.to_owned(),
            gender: gender.to_owned(),
            phone: phone.to_owned(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}{}", self.family_name, self.given_name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Add,
    Update,
}

pub fn sample_users() -> Vec<User> {
    vec![
        User::new(1, "Lovelace", "Ada", "Female", "5550100001"),
        User::new(2, "Turing", "Alan", "Male", "5550100002"),
        User::new(3, "Hopper", "Grace", "Female", "5550100003"),
        User::new(4, "Liskov", "Barbara", "Female", "5550100004"),
        User::new(5, "Knuth", "Donald", "Male", "5550100005"),
    ]
}

/// Root element of the application.
pub fn app_element() -> Element {
    Element::component(&Component::new(app), Props::new())
}

fn app(_: &Props) -> Element {
    let (dialog_visible, set_dialog_visible) = use_state(false);
    let (mode, set_mode) = use_state(Mode::Add);
    let (form, set_form) = use_state(None::<User>);
    let (users, set_users) = use_state(sample_users());
    let saves = use_ref(0usize);

    {
        let count = users.len();
        use_effect(
            move || {
                let saved = saves.update(|saves| {
                    *saves += 1;
                    *saves
                });
                log::info!("user list saved ({count} users, save #{saved})");
            },
            deps![users],
        );
    }

    let add_user = {
        let set_form = set_form.clone();
        let set_mode = set_mode.clone();
        let set_dialog_visible = set_dialog_visible.clone();
        move |_: &Event| {
            set_form.set(None);
            set_mode.set(Mode::Add);
            set_dialog_visible.set(true);
        }
    };

    let rows: Vec<Element> = users
        .iter()
        .map(|user| {
            user_row(
                user,
                &set_users,
                &set_form,
                &set_mode,
                &set_dialog_visible,
            )
        })
        .collect();

    let dialog = Element::component(
        &Component::new(user_dialog),
        Props::new()
            .with("visible", dialog_visible)
            .with_data("mode", mode)
            .with_data("form", form)
            .with_data("set_visible", set_dialog_visible)
            .with_data("set_users", set_users)
            .with_data("set_form", set_form),
    );

    Element::host("form")
        .attr("class", "form")
        .child(
            Element::host("button")
                .attr("type", "button")
                .attr("class", "add-button")
                .on("onClick", add_user)
                .child("Add"),
        )
        .child(dialog)
        .child(
            Element::host("table")
                .attr("class", "user-table")
                .child(Element::host("caption").child("Users"))
                .child(
                    Element::host("tbody")
                        .child(header_row())
                        .child(rows),
                ),
        )
        .build()
}

fn header_row() -> Element {
    let columns = ["id", "name", "gender", "phone", "actions"];
    Element::host("tr")
        .child(
            columns
                .iter()
                .map(|column| Element::host("th").attr("scope", "col").child(*column).build())
                .collect::<Vec<_>>(),
        )
        .build()
}

fn user_row(
    user: &User,
    set_users: &SetState<Vec<User>>,
    set_form: &SetState<Option<User>>,
    set_mode: &SetState<Mode>,
    set_dialog_visible: &SetState<bool>,
) -> Element {
    let edit = {
        let user = user.clone();
        let set_form = set_form.clone();
        let set_mode = set_mode.clone();
        let set_dialog_visible = set_dialog_visible.clone();
        move |_: &Event| {
            set_mode.set(Mode::Update);
            set_form.set(Some(user.clone()));
            set_dialog_visible.set(true);
        }
    };
    let delete = {
        let id = user.id;
        let set_users = set_users.clone();
        move |_: &Event| {
            set_users.update(move |users| {
                users.iter().filter(|user| user.id != id).cloned().collect()
            });
        }
    };

    Element::host("tr")
        .attr("data-user", user.id.to_string())
        .child(Element::host("td").child(user.id))
        .child(Element::host("td").child(user.full_name()))
        .child(Element::host("td").child(user.gender.clone()))
        .child(Element::host("td").child(user.phone.clone()))
        .child(
            Element::host("td")
                .attr("class", "operation-col")
                .child(
                    Element::host("button")
                        .attr("type", "button")
                        .attr("data-action", format!("update-{}", user.id))
                        .on("onClick", edit)
                        .child("Update"),
                )
                .child(
                    Element::host("button")
                        .attr("type", "button")
                        .attr("data-action", format!("delete-{}", user.id))
                        .on("onClick", delete)
                        .child("Delete"),
                ),
        )
        .build()
}

fn user_dialog(props: &Props) -> Element {
    let visible = props.get("visible").and_then(|v| v.as_bool()).unwrap_or(false);
    let mode = props.get_data::<Mode>("mode").map_or(Mode::Add, |mode| *mode);
    let form = props
        .get_data::<Option<User>>("form")
        .and_then(|form| (*form).clone());
    let (Some(set_visible), Some(set_users), Some(set_form)) = (
        props.get_data::<SetState<bool>>("set_visible"),
        props.get_data::<SetState<Vec<User>>>("set_users"),
        props.get_data::<SetState<Option<User>>>("set_form"),
    ) else {
        log::warn!("user dialog rendered without its setters");
        return Element::host("div").attr("class", "user-dialog closed").build();
    };

    let close = {
        let set_visible = (*set_visible).clone();
        move |_: &Event| set_visible.set(false)
    };
    let confirm = {
        let set_visible = (*set_visible).clone();
        let set_users = (*set_users).clone();
        let form = form.clone();
        move |_: &Event| {
            let submitted = form.clone().unwrap_or_default();
            match mode {
                Mode::Add => set_users.update(move |users| {
                    let mut next = users.clone();
                    let mut user = submitted.clone();
                    user.id = users.len() as i64 + 1;
                    next.push(user);
                    next
                }),
                Mode::Update => set_users.update(move |users| {
                    users
                        .iter()
                        .map(|user| {
                            if user.id == submitted.id {
                                submitted.clone()
                            } else {
                                user.clone()
                            }
                        })
                        .collect()
                }),
            }
            set_visible.set(false);
        }
    };

    let current = form.unwrap_or_default();
    let class = if visible {
        "user-dialog"
    } else {
        "user-dialog closed"
    };

    Element::host("div")
        .attr("class", class)
        .child(
            Element::host("button")
                .attr("type", "button")
                .attr("class", "dialog-close-button")
                .on("onClick", close.clone())
                .child("Close"),
        )
        .child(Element::host("header").attr("class", "dialog-header").child("Add / update user"))
        .child(
            Element::host("section")
                .attr("class", "dialog-body")
                .child(text_field("userFamilyName", "Family name", &current.family_name, &set_form, |user, value| {
                    user.family_name = value
                }))
                .child(text_field("userGivenName", "Given name", &current.given_name, &set_form, |user, value| {
                    user.given_name = value
                }))
                .child(gender_field(&current.gender, &set_form))
                .child(text_field("phone", "Phone", &current.phone, &set_form, |user, value| {
                    user.phone = value
                })),
        )
        .child(
            Element::host("footer")
                .attr("class", "dialog-footer")
                .child(
                    Element::host("button")
                        .attr("type", "button")
                        .on("onClick", close)
                        .child("Cancel"),
                )
                .child(
                    Element::host("button")
                        .attr("type", "button")
                        .attr("id", "confirm")
                        .on("onClick", confirm)
                        .child("Confirm"),
                ),
        )
        .build()
}

fn text_field(
    id: &str,
    label: &str,
    value: &str,
    set_form: &SetState<Option<User>>,
    apply: fn(&mut User, String),
) -> Element {
    let on_input = {
        let set_form = set_form.clone();
        move |event: &Event| {
            let value = event.value.clone().unwrap_or_default();
            set_form.update(move |form| {
                let mut next = form.clone().unwrap_or_default();
                apply(&mut next, value.clone());
                Some(next)
            });
        }
    };
    Element::host("div")
        .attr("class", "field")
        .child(Element::host("label").attr("for", id).child(label.to_owned()))
        .child(
            Element::host("input")
                .attr("type", "text")
                .attr("id", id)
                .attr("value", value.to_owned())
                .on("onInput", on_input),
        )
        .build()
}

fn gender_field(current: &str, set_form: &SetState<Option<User>>) -> Element {
    let options = [("Male", "Male"), ("Female", "Female"), ("Non-binary", "Other")];
    let choices: Vec<Element> = options
        .iter()
        .map(|&(gender, label)| {
            let pick = {
                let set_form = set_form.clone();
                move |_: &Event| {
                    set_form.update(move |form| {
                        let mut next = form.clone().unwrap_or_default();
                        next.gender = gender.to_owned();
                        Some(next)
                    });
                }
            };
            Element::host("div")
                .child(
                    Element::host("input")
                        .attr("type", "radio")
                        .attr("id", format!("gender-{gender}"))
                        .attr("checked", current == gender)
                        .on("onClick", pick),
                )
                .child(Element::host("label").child(label))
                .build()
        })
        .collect();
    Element::host("div")
        .attr("class", "field")
        .child(Element::host("p").child("Gender"))
        .child(choices)
        .build()
}

#[cfg(test)]
mod tests {
    use fiber_testing::TestRoot;

    use super::*;

    fn rows(root: &TestRoot) -> usize {
        (1..=20)
            .filter(|id| {
                root.host()
                    .find_by_attr(root.container(), "data-user", &id.to_string())
                    .is_some()
            })
            .count()
    }

    #[test]
    fn renders_every_sample_user() {
        let root = TestRoot::mount(app_element());
        assert_eq!(rows(&root), sample_users().len());
        assert!(root.text().contains("LovelaceAda"));
        assert!(root.dump().contains(r#"class="user-dialog closed""#));
    }

    #[test]
    fn delete_removes_the_row() {
        let mut root = TestRoot::mount(app_element());
        root.click("data-action", "delete-2");
        root.flush();

        assert_eq!(rows(&root), sample_users().len() - 1);
        assert!(!root.text().contains("TuringAlan"));
    }

    #[test]
    fn add_dialog_appends_a_user() {
        let mut root = TestRoot::mount(app_element());
        root.click("class", "add-button");
        root.flush();
        assert!(root.dump().contains(r#"class="user-dialog""#));

        root.input("id", "userFamilyName", "Hamilton");
        root.flush();
        root.input("id", "userGivenName", "Margaret");
        root.flush();
        root.click("id", "gender-Female");
        root.flush();
        root.click("id", "confirm");
        root.flush();

        assert_eq!(rows(&root), sample_users().len() + 1);
        assert!(root.text().contains("HamiltonMargaret"));
        assert!(root.dump().contains(r#"class="user-dialog closed""#));
    }

    #[test]
    fn update_dialog_edits_in_place() {
        let mut root = TestRoot::mount(app_element());
        root.click("data-action", "update-3");
        root.flush();
        let phone = root.find("id", "phone");
        assert_eq!(
            root.host()
                .node(phone)
                .and_then(|node| node.attr("value"))
                .and_then(|value| value.as_str()),
            Some("5550100003")
        );

        root.input("id", "phone", "5550199999");
        root.flush();
        root.click("id", "confirm");
        root.flush();

        assert_eq!(rows(&root), sample_users().len());
        assert!(root.text().contains("5550199999"));
        assert!(!root.text().contains("5550100003"));
    }
}
