//! Federated Service Detail Page

use crate::api;
use crate::collaborators::{page_collaborators, ModalSlot};
use crate::components::ErrorBanner;
use crate::config::UiConfig;
use crate::utils::service_type;
use fleetview_common::action::ActionPhase;
use fleetview_common::controller::{DetailState, ResourceMode, ServiceDetailController};
use fleetview_common::federated::{PodSummary, ServiceInfo};
use fleetview_common::view::service::{ReplicaStatus, ServiceOperation};
use leptos::*;
use leptos_router::*;
use serde_json::Value;
use std::rc::Rc;

#[component]
pub fn ServiceDetailPage() -> impl IntoView {
    let params = use_params_map();
    let param = move |key: &str| params.with(|p| p.get(key).cloned().unwrap_or_default());

    move || {
        let workspace = param("workspace");
        let namespace = param("namespace");
        let name = param("name");
        view! { <ServiceDetail workspace=workspace namespace=namespace name=name/> }
    }
}

#[component]
fn ServiceDetail(workspace: String, namespace: String, name: String) -> impl IntoView {
    let config = use_context::<UiConfig>().unwrap_or_default();
    let ctx = config.context(Some(&workspace), None);
    let info_form = ModalSlot::<ServiceInfo>::new();
    let yaml_form = ModalSlot::<Value>::new();
    let controller = Rc::new(ServiceDetailController::new(
        ctx,
        &namespace,
        &name,
        Rc::new(api::client(&config.api_root)),
        page_collaborators(),
        info_form.clone(),
        yaml_form.clone(),
    ));

    let (state, set_state) = create_signal(controller.state());
    let (busy, set_busy) = create_signal(false);
    let view_model = create_rw_signal(controller.view());
    {
        let weak = Rc::downgrade(&controller);
        controller.subscribe(move |s| {
            set_state.set(s.clone());
            if let Some(page) = weak.upgrade() {
                view_model.set(page.view());
            }
        });
    }
    controller
        .dispatcher()
        .subscribe(move |phase| set_busy.set(*phase != ActionPhase::Idle));

    let page = store_value(controller);
    on_cleanup(move || {
        page.try_with_value(|p| p.dispose());
    });

    spawn_local({
        let page = page.get_value();
        async move { page.load_project().await }
    });

    let operate = move |op: ServiceOperation| {
        let page = page.get_value();
        spawn_local(async move {
            match op {
                ServiceOperation::EditInfo => page.edit_info().await,
                ServiceOperation::EditYaml => page.edit_yaml().await,
                ServiceOperation::Delete => page.delete().await,
            };
        });
    };
    let refresh_cluster = move |cluster: String| {
        let page = page.get_value();
        spawn_local(async move { page.refresh_cluster(&cluster).await });
    };

    let detail_error = Signal::derive(move || state.with(|s| s.detail_error.clone()));
    let title = move || view_model.with(|v| v.as_ref().map(|v| v.title.clone()).unwrap_or_else(|| name.clone()));
    let list_url = move || view_model.with(|v| v.as_ref().map(|v| v.list_url.clone()).unwrap_or_default());

    view! {
        <div class="page">
            <div class="page-header">
                <div>
                    <A href=list_url class="back-link">"← Services"</A>
                    <h1>{title}</h1>
                    <p class="page-subtitle">
                        {move || view_model.with(|v| v.as_ref().and_then(|v| v.description.clone()))}
                    </p>
                </div>
                <div class="toolbar-actions">
                    {move || view_model.with(|v| {
                        v.as_ref()
                            .map(|v| v.operations.clone())
                            .unwrap_or_default()
                            .into_iter()
                            .map(|op| {
                                let text = match op {
                                    ServiceOperation::EditInfo => "Edit Info",
                                    ServiceOperation::EditYaml => "Edit YAML",
                                    ServiceOperation::Delete => "Delete",
                                };
                                view! {
                                    <button class="btn btn-secondary" disabled=move || busy.get() on:click=move |_| operate(op)>
                                        {text}
                                    </button>
                                }
                            })
                            .collect_view()
                    })}
                </div>
            </div>

            <ErrorBanner message=detail_error/>
            <Show when=move || state.with(|s| s.detail_loading && s.detail.is_none())>
                <p class="loading">"Loading..."</p>
            </Show>

            <div class="detail-layout">
                <div class="card">
                    <h3>"Attributes"</h3>
                    <dl class="attributes">
                        {move || view_model.with(|v| {
                            v.as_ref()
                                .map(|v| v.attributes.clone())
                                .unwrap_or_default()
                                .into_iter()
                                .map(|attr| {
                                    let value = if attr.name == "Type" { service_type(&attr.value) } else { attr.value };
                                    view! {
                                        <dt>{attr.name}</dt>
                                        <dd>{value}</dd>
                                    }
                                })
                                .collect_view()
                        })}
                    </dl>
                </div>

                <div class="card">
                    <h3>"Resource Status"</h3>
                    <Show when=move || state.with(|s| s.resources_loading)>
                        <p class="loading">"Loading..."</p>
                    </Show>
                    <For
                        each=move || state.with(|s| s.clusters.clone())
                        key=|cluster| cluster.clone()
                        children=move |cluster| view! {
                            <ClusterPanel cluster=cluster state=state on_refresh=refresh_cluster/>
                        }
                    />
                </div>
            </div>

            <InfoModal modal=info_form/>
            <YamlModal modal=yaml_form/>
        </div>
    }
}

/// Replica status or pods of the service in one member cluster
#[component]
fn ClusterPanel<F>(cluster: String, state: ReadSignal<DetailState>, on_refresh: F) -> impl IntoView
where
    F: Fn(String) + Copy + 'static,
{
    let name = cluster.clone();
    let error = {
        let cluster = cluster.clone();
        move || state.with(|s| s.resource_errors.get(&cluster).cloned())
    };
    let replicas = {
        let cluster = cluster.clone();
        move || {
            state.with(|s| match s.resource_mode() {
                ResourceMode::Workload { .. } => s.workloads.get(&cluster).map(ReplicaStatus::project),
                ResourceMode::Pods => None,
            })
        }
    };
    let pods = {
        let cluster = cluster.clone();
        move || state.with(|s| s.pods.get(&cluster).cloned().unwrap_or_default())
    };

    view! {
        <div class="cluster-panel">
            <div class="cluster-panel-header">
                <strong>{cluster.clone()}</strong>
                {move || replicas().map(|status| {
                    let class = if status.healthy { "badge badge-success" } else { "badge badge-warning" };
                    view! { <span class=class>{status.text()}</span> }
                })}
                <button class="btn btn-link" on:click=move |_| on_refresh(name.clone())>"Refresh"</button>
            </div>
            {move || error().map(|msg| view! { <div class="alert alert-error">{msg}</div> })}
            <PodTable pods=Signal::derive(pods)/>
        </div>
    }
}

#[component]
fn PodTable(pods: Signal<Vec<PodSummary>>) -> impl IntoView {
    view! {
        <Show when=move || pods.with(|p| !p.is_empty()) fallback=|| view! { <p class="muted">"No pods"</p> }>
            <table class="table table-compact">
                <thead>
                    <tr>
                        <th>"Pod"</th>
                        <th>"Node"</th>
                        <th>"Phase"</th>
                        <th>"Ready"</th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=move || pods.get()
                        key=|pod| format!("{:?}", pod)
                        children=|pod| view! {
                            <tr>
                                <td>{pod.name.clone()}</td>
                                <td>{pod.node.clone().unwrap_or_else(|| "-".to_string())}</td>
                                <td>{pod.phase.clone()}</td>
                                <td>{format!("{}/{}", pod.ready_containers, pod.total_containers)}</td>
                            </tr>
                        }
                    />
                </tbody>
            </table>
        </Show>
    }
}

#[component]
fn InfoModal(modal: Rc<ModalSlot<ServiceInfo>>) -> impl IntoView {
    let draft = modal.draft();
    let slot = store_value(modal);
    let field = move |read: fn(&ServiceInfo) -> String| move || draft.with(|d| d.as_ref().map(read).unwrap_or_default());

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <div class="modal-backdrop">
                <div class="modal">
                    <h3>"Edit Info"</h3>
                    <label class="form-label">"Alias"</label>
                    <input
                        type="text"
                        prop:value=field(|i| i.alias_name.clone())
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            slot.with_value(|s| s.edit(|info| info.alias_name = value));
                        }
                    />
                    <label class="form-label">"Description"</label>
                    <textarea
                        prop:value=field(|i| i.description.clone())
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            slot.with_value(|s| s.edit(|info| info.description = value));
                        }
                    ></textarea>
                    <div class="modal-actions">
                        <button class="btn btn-secondary" on:click=move |_| slot.with_value(|s| s.finish(false))>"Cancel"</button>
                        <button class="btn btn-primary" on:click=move |_| slot.with_value(|s| s.finish(true))>"Save"</button>
                    </div>
                </div>
            </div>
        </Show>
    }
}

/// Whole-object editor; the object is edited as YAML text
#[component]
fn YamlModal(modal: Rc<ModalSlot<Value>>) -> impl IntoView {
    let draft = modal.draft();
    let slot = store_value(modal);
    let (text, set_text) = create_signal(String::new());
    let (error, set_error) = create_signal::<Option<String>>(None);

    // Reseed the editor each time the modal opens
    create_effect(move |was_open: Option<bool>| {
        let open = draft.with(Option::is_some);
        if open && was_open != Some(true) {
            let yaml = draft.with_untracked(|d| d.as_ref().map(serde_yaml::to_string));
            match yaml {
                Some(Ok(yaml)) => set_text.set(yaml),
                Some(Err(e)) => set_error.set(Some(e.to_string())),
                None => {}
            }
        }
        open
    });

    let save = move |_| match serde_yaml::from_str::<Value>(&text.get_untracked()) {
        Ok(object) => {
            set_error.set(None);
            slot.with_value(|s| {
                s.edit(|draft| *draft = object);
                s.finish(true);
            });
        }
        Err(e) => set_error.set(Some(format!("Invalid YAML: {}", e))),
    };
    let cancel = move |_| {
        set_error.set(None);
        slot.with_value(|s| s.finish(false));
    };

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <div class="modal-backdrop">
                <div class="modal modal-wide">
                    <h3>"Edit YAML"</h3>
                    <textarea
                        class="code-editor"
                        rows="30"
                        prop:value=text
                        on:input=move |ev| set_text.set(event_target_value(&ev))
                    ></textarea>
                    {move || error.get().map(|msg| view! { <p class="form-error">{msg}</p> })}
                    <div class="modal-actions">
                        <button class="btn btn-secondary" on:click=cancel>"Cancel"</button>
                        <button class="btn btn-primary" on:click=save>"Update"</button>
                    </div>
                </div>
            </div>
        </Show>
    }
}
