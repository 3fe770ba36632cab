//! Stack of update toasts. A toast fades after its lifetime and the page
//! reloads once it is gone.

use gloo_timers::callback::Timeout;
use leptos::prelude::*;

use smartval_shared::locale;
use smartval_shared::timing::{TOAST_FADE_MS, TOAST_LIFETIME_MS};

use crate::dom;

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub heading: String,
    pub message: String,
    /// Set one tick after insertion so the slide-in transition runs.
    pub shown: bool,
    pub fading: bool,
}

#[derive(Clone, Copy)]
pub struct Toasts(pub RwSignal<Vec<Toast>>);

fn next_id(toasts: &[Toast]) -> u64 {
    toasts.iter().map(|t| t.id).max().map_or(1, |id| id + 1)
}

fn update_toast(toasts: &mut [Toast], id: u64, change: impl FnOnce(&mut Toast)) -> bool {
    match toasts.iter_mut().find(|t| t.id == id) {
        Some(toast) => {
            change(toast);
            true
        }
        None => false,
    }
}

fn remove_toast(toasts: &mut Vec<Toast>, id: u64) -> bool {
    let before = toasts.len();
    toasts.retain(|t| t.id != id);
    toasts.len() != before
}

impl Toasts {
    pub fn push(self, label: &str, message: String) {
        let Toasts(toasts) = self;
        let mut id = 0;
        toasts.update(|list| {
            id = next_id(list);
            list.push(Toast {
                id,
                heading: locale::toast_heading(label),
                message,
                shown: false,
                fading: false,
            });
        });

        Timeout::new(0, move || {
            toasts.update(|list| {
                update_toast(list, id, |t| t.shown = true);
            });
        })
        .forget();

        Timeout::new(TOAST_LIFETIME_MS, move || {
            let mut still_shown = false;
            toasts.update(|list| {
                still_shown = update_toast(list, id, |t| t.fading = true);
            });
            if !still_shown {
                return;
            }
            Timeout::new(TOAST_FADE_MS, move || {
                toasts.update(|list| {
                    remove_toast(list, id);
                });
                web_sys::console::info_1(&"[ws] toast expired; reloading".into());
                dom::reload();
            })
            .forget();
        })
        .forget();
    }
}

#[component]
pub fn ToastStack() -> impl IntoView {
    let Toasts(toasts) = expect_context();

    view! {
        <For
            each=move || toasts.get()
            key=|toast| toast.id
            children=move |toast| {
                let id = toast.id;
                let flag = move |read: fn(&Toast) -> bool| {
                    toasts.with(|list| list.iter().any(|t| t.id == id && read(t)))
                };
                view! {
                    <div
                        class="ws-toast"
                        class:show=move || flag(|t| t.shown)
                        style:opacity=move || if flag(|t| t.fading) { "0" } else { "" }
                    >
                        <div class="ws-toast-content">
                            <span class="ws-toast-heading">{toast.heading}</span>
                            <br />
                            {toast.message}
                        </div>
                        <button class="ws-toast-btn" on:click=move |_| dom::reload()>
                            {locale::TOAST_REFRESH}
                        </button>
                    </div>
                }
            }
        />
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toast(id: u64) -> Toast {
        Toast {
            id,
            heading: String::new(),
            message: format!("m{id}"),
            shown: false,
            fading: false,
        }
    }

    #[test]
    fn ids_keep_increasing() {
        assert_eq!(next_id(&[]), 1);
        assert_eq!(next_id(&[toast(3), toast(1)]), 4);
    }

    #[test]
    fn fading_a_removed_toast_reports_absence() {
        let mut list = vec![toast(1), toast(2)];
        assert!(update_toast(&mut list, 2, |t| t.fading = true));
        assert!(list[1].fading);
        assert!(remove_toast(&mut list, 2));
        assert!(!update_toast(&mut list, 2, |t| t.fading = true));
        assert!(!remove_toast(&mut list, 2));
        assert_eq!(list, vec![toast(1)]);
    }
}
