//! Browser implementations of the controller collaborators

use async_trait::async_trait;
use fleetview_common::action::{Confirmation, Confirmer, FormModal, Navigator, Notice, NoticeLevel, Notifier};
use fleetview_common::controller::Collaborators;
use futures::channel::oneshot;
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Native `window.confirm` dialog
pub struct BrowserConfirmer;

#[async_trait(?Send)]
impl Confirmer for BrowserConfirmer {
    async fn confirm(&self, confirmation: &Confirmation) -> bool {
        let message = format!("{}\n\n{}", confirmation.title, confirmation.message);
        web_sys::window()
            .and_then(|w| w.confirm_with_message(&message).ok())
            .unwrap_or(false)
    }
}

/// Router navigation; build inside a routed component
pub struct RouterNavigator {
    navigate: Rc<dyn Fn(&str)>,
}

impl RouterNavigator {
    pub fn new() -> Self {
        let navigate = leptos_router::use_navigate();
        Self {
            navigate: Rc::new(move |path: &str| navigate(path, Default::default())),
        }
    }
}

impl Navigator for RouterNavigator {
    fn navigate(&self, path: &str) {
        logging::log!("Navigating to {}", path);
        (self.navigate)(path);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub notice: Notice,
}

/// Transient notifications shown in the corner of every page
#[derive(Clone, Copy)]
pub struct Toasts {
    items: RwSignal<Vec<Toast>>,
    next_id: StoredValue<u64>,
}

const TOAST_MILLIS: u32 = 5_000;

impl Toasts {
    pub fn new() -> Self {
        Self {
            items: create_rw_signal(Vec::new()),
            next_id: store_value(0),
        }
    }

    pub fn items(&self) -> ReadSignal<Vec<Toast>> {
        self.items.read_only()
    }

    pub fn dismiss(&self, id: u64) {
        self.items.try_update(|items| items.retain(|t| t.id != id));
    }

    fn push(&self, notice: Notice) {
        let id = self.next_id.get_value();
        self.next_id.set_value(id + 1);
        self.items.update(|items| items.push(Toast { id, notice }));

        let toasts = *self;
        spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(TOAST_MILLIS).await;
            toasts.dismiss(id);
        });
    }
}

impl Notifier for Toasts {
    fn notify(&self, notice: Notice) {
        if notice.level == NoticeLevel::Error {
            logging::warn!("{}", notice.message);
        }
        self.push(notice);
    }
}

#[component]
pub fn ToastStack(toasts: Toasts) -> impl IntoView {
    view! {
        <div class="toast-stack">
            <For
                each=move || toasts.items().get()
                key=|toast| toast.id
                children=move |toast| {
                    let class = match toast.notice.level {
                        NoticeLevel::Success => "toast toast-success",
                        NoticeLevel::Error => "toast toast-error",
                    };
                    view! {
                        <div class=class on:click=move |_| toasts.dismiss(toast.id)>
                            {toast.notice.message.clone()}
                        </div>
                    }
                }
            />
        </div>
    }
}

/// A modal form driven by a controller.
///
/// `show` publishes the initial value as the draft and waits until the modal
/// calls [`ModalSlot::finish`]; a newer `show` cancels the older one.
pub struct ModalSlot<C: 'static> {
    draft: RwSignal<Option<C>>,
    reply: RefCell<Option<oneshot::Sender<Option<C>>>>,
}

impl<C: Clone + 'static> ModalSlot<C> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            draft: create_rw_signal(None),
            reply: RefCell::new(None),
        })
    }

    /// Value being edited, `None` while the modal is closed
    pub fn draft(&self) -> RwSignal<Option<C>> {
        self.draft
    }

    pub fn edit(&self, change: impl FnOnce(&mut C)) {
        self.draft.update(|draft| {
            if let Some(draft) = draft {
                change(draft);
            }
        });
    }

    /// Close the modal, submitting the draft or cancelling
    pub fn finish(&self, submit: bool) {
        let value = if submit { self.draft.get_untracked() } else { None };
        self.draft.set(None);
        if let Some(reply) = self.reply.borrow_mut().take() {
            let _ = reply.send(value);
        }
    }
}

#[async_trait(?Send)]
impl<C: Clone + 'static> FormModal<C> for ModalSlot<C> {
    async fn show(&self, initial: C) -> Option<C> {
        let (tx, rx) = oneshot::channel();
        if let Some(previous) = self.reply.borrow_mut().replace(tx) {
            let _ = previous.send(None);
        }
        self.draft.set(Some(initial));
        rx.await.ok().flatten()
    }
}

/// Collaborators for a page mounted under the router
pub fn page_collaborators() -> Collaborators {
    let toasts = use_context::<Toasts>().unwrap_or_else(Toasts::new);
    Collaborators {
        confirmer: Rc::new(BrowserConfirmer),
        notifier: Rc::new(toasts),
        navigator: Rc::new(RouterNavigator::new()),
    }
}
