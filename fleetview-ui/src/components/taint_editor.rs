use crate::collaborators::ModalSlot;
use fleetview_common::controller::TaintForm;
use fleetview_common::node::{Taint, TaintEffect};
use leptos::*;
use std::rc::Rc;

/// Taint management modal: edits the taint set applied to every selected node
#[component]
pub fn TaintEditor(modal: Rc<ModalSlot<TaintForm>>) -> impl IntoView {
    let draft = modal.draft();
    let slot = store_value(modal);

    let (key, set_key) = create_signal(String::new());
    let (value, set_value) = create_signal(String::new());
    let (effect, set_effect) = create_signal(TaintEffect::NoSchedule.to_string());
    let (error, set_error) = create_signal::<Option<String>>(None);

    let add = move |_| {
        let text = format!("{}={}:{}", key.get().trim(), value.get().trim(), effect.get());
        match text.parse::<Taint>() {
            Ok(taint) => {
                slot.with_value(|s| {
                    s.edit(|form| {
                        if !form.taints.contains(&taint) {
                            form.taints.push(taint);
                        }
                    })
                });
                set_key.set(String::new());
                set_value.set(String::new());
                set_error.set(None);
            }
            Err(e) => set_error.set(Some(e)),
        }
    };

    let taints = move || {
        draft.with(|d| d.as_ref().map(|form| form.taints.clone()).unwrap_or_default())
    };
    let nodes = move || draft.with(|d| d.as_ref().map(|form| form.nodes.join(", ")).unwrap_or_default());

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <div class="modal-backdrop">
                <div class="modal">
                    <h3>"Taint Management"</h3>
                    <p class="modal-subtitle">{nodes}</p>

                    <ul class="taint-list">
                        <For
                            each=taints
                            key=|taint| taint.to_string()
                            children=move |taint| {
                                let text = taint.to_string();
                                view! {
                                    <li>
                                        <code>{text}</code>
                                        <button
                                            class="btn btn-link"
                                            on:click=move |_| {
                                                slot.with_value(|s| s.edit(|form| form.taints.retain(|t| *t != taint)))
                                            }
                                        >
                                            "Remove"
                                        </button>
                                    </li>
                                }
                            }
                        />
                    </ul>

                    <div class="form-row">
                        <input
                            type="text"
                            placeholder="Key"
                            prop:value=key
                            on:input=move |ev| set_key.set(event_target_value(&ev))
                        />
                        <input
                            type="text"
                            placeholder="Value"
                            prop:value=value
                            on:input=move |ev| set_value.set(event_target_value(&ev))
                        />
                        <select on:change=move |ev| set_effect.set(event_target_value(&ev))>
                            {TaintEffect::ALL
                                .iter()
                                .map(|e| {
                                    let name = e.to_string();
                                    view! { <option value=name.clone() selected=move || effect.get() == name>{e.to_string()}</option> }
                                })
                                .collect_view()}
                        </select>
                        <button class="btn btn-secondary" on:click=add>"Add"</button>
                    </div>
                    {move || error.get().map(|msg| view! { <p class="form-error">{msg}</p> })}

                    <div class="modal-actions">
                        <button class="btn btn-secondary" on:click=move |_| slot.with_value(|s| s.finish(false))>
                            "Cancel"
                        </button>
                        <button class="btn btn-primary" on:click=move |_| slot.with_value(|s| s.finish(true))>
                            "Save"
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}
