//! Cluster Node List Page
//!
//! Node table with live usage columns, an overview card, row actions
//! (cordon, uncordon, delete) and batch taint management.

use crate::api;
use crate::collaborators::{page_collaborators, ModalSlot};
use crate::components::{ErrorBanner, Pagination, TaintEditor, UsageColumn};
use crate::config::UiConfig;
use crate::utils::{label, node_keys, node_status_class};
use fleetview_common::action::ActionPhase;
use fleetview_common::controller::{NodesController, TaintForm};
use fleetview_common::list::DEFAULT_PAGE_SIZE;
use fleetview_common::node::NodeStatus;
use fleetview_common::view::{NodeAction, NodeBatchAction, NodeOverview, NodeRow};
use fleetview_common::ListQuery;
use leptos::*;
use leptos_router::*;
use std::collections::BTreeSet;
use std::rc::Rc;

#[component]
pub fn NodesPage() -> impl IntoView {
    let params = use_params_map();
    let cluster = move || params.with(|p| p.get("cluster").cloned().unwrap_or_default());

    // Remount per cluster so the previous controller is disposed
    move || {
        let cluster = cluster();
        view! { <NodeList cluster=cluster/> }
    }
}

#[component]
fn NodeList(cluster: String) -> impl IntoView {
    let config = use_context::<UiConfig>().unwrap_or_default();
    let ctx = config.context(None, Some(&cluster));
    let taint_form = ModalSlot::<TaintForm>::new();
    let controller = Rc::new(NodesController::new(
        ctx.clone(),
        &cluster,
        Rc::new(api::client(&config.api_root)),
        page_collaborators(),
        taint_form.clone(),
    ));

    let (state, set_state) = create_signal(controller.state());
    let (overview, set_overview) = create_signal(controller.overview());
    let (busy, set_busy) = create_signal(false);
    controller.aggregator().subscribe(move |s| set_state.set(s.clone()));
    controller
        .dispatcher()
        .subscribe(move |phase| set_busy.set(*phase != ActionPhase::Idle));

    let page = store_value(controller);
    on_cleanup(move || {
        page.try_with_value(|p| p.dispose());
    });

    let current_page = create_rw_signal(1u32);
    let (search, set_search) = create_signal(String::new());
    let (status_filter, set_status_filter) = create_signal(String::new());
    let selected = create_rw_signal(BTreeSet::<String>::new());

    let query = move || {
        ListQuery::page(current_page.get(), DEFAULT_PAGE_SIZE)
            .with_filter("name", search.get().trim())
            .with_filter("status", &status_filter.get())
    };

    let load = move |query: ListQuery| {
        let page = page.get_value();
        spawn_local(async move {
            page.load(query).await;
            set_overview.set(page.overview());
        });
    };

    let refresh = move || {
        let page = page.get_value();
        selected.set(BTreeSet::new());
        spawn_local(async move {
            page.refresh().await;
            set_overview.set(page.overview());
        });
    };

    // Any query change reloads; the aggregator keeps only the newest answer
    create_effect(move |_| load(query()));

    spawn_local({
        let page = page.get_value();
        async move {
            page.load_counts().await;
            set_overview.set(page.overview());
        }
    });

    let row_ctx = ctx.clone();
    let rows = create_memo(move |_| {
        state.with(|s| {
            s.list
                .items
                .iter()
                .map(|node| NodeRow::project(&row_ctx, node, &s.metrics))
                .collect::<Vec<_>>()
        })
    });
    let row_names = move || rows.with(|rows| node_keys(rows));
    let metrics_loading = Signal::derive(move || state.with(|s| s.metrics_loading));

    let run_action = move |action: NodeAction, node: String| {
        let page = page.get_value();
        spawn_local(async move {
            match action {
                NodeAction::Cordon => page.cordon(&node).await,
                NodeAction::Uncordon => page.uncordon(&node).await,
                NodeAction::Delete => page.delete(&node).await,
            };
            set_overview.set(page.overview());
        });
    };

    let run_batch = move |action: NodeBatchAction| {
        let page = page.get_value();
        let nodes: Vec<String> = selected.get_untracked().into_iter().collect();
        if nodes.is_empty() {
            return;
        }
        spawn_local(async move {
            let outcome = match action {
                NodeBatchAction::Taint => page.batch_taint(nodes).await,
                NodeBatchAction::Delete => page.batch_delete(nodes).await,
            };
            if outcome.is_success() {
                selected.set(BTreeSet::new());
            }
            set_overview.set(page.overview());
        });
    };

    let batch_actions = NodeBatchAction::visible(&ctx);
    let total_pages = Signal::derive(move || state.with(|s| s.list.total_pages()));
    let total = Signal::derive(move || state.with(|s| s.list.total));
    let list_error = Signal::derive(move || state.with(|s| s.list.error.clone()));

    view! {
        <div class="page">
            <div class="page-header">
                <div>
                    <h1>"Cluster Nodes"</h1>
                    <p class="page-subtitle">"Cluster: " {cluster}</p>
                </div>
                <button class="btn btn-primary" disabled=move || state.with(|s| s.list.loading) on:click=move |_| refresh()>
                    {move || if state.with(|s| s.list.loading) { "Loading..." } else { "Refresh" }}
                </button>
            </div>

            <OverviewCard overview=overview/>

            <div class="toolbar">
                <input
                    type="text"
                    placeholder="Search by name..."
                    prop:value=search
                    on:change=move |ev| {
                        current_page.set(1);
                        set_search.set(event_target_value(&ev));
                    }
                />
                <select on:change=move |ev| {
                    current_page.set(1);
                    set_status_filter.set(event_target_value(&ev));
                }>
                    <option value="">"All Statuses"</option>
                    {NodeStatus::filter_options()
                        .into_iter()
                        .map(|status| view! { <option value=status.as_str()>{label(&status.label_key())}</option> })
                        .collect_view()}
                </select>
                <div class="toolbar-actions">
                    {batch_actions
                        .into_iter()
                        .map(|action| {
                            let text = match action {
                                NodeBatchAction::Taint => "Taint Management",
                                NodeBatchAction::Delete => "Delete",
                            };
                            view! {
                                <button
                                    class="btn btn-secondary"
                                    disabled=move || busy.get() || selected.with(BTreeSet::is_empty)
                                    on:click=move |_| run_batch(action)
                                >
                                    {text}
                                </button>
                            }
                        })
                        .collect_view()}
                </div>
            </div>

            <ErrorBanner message=list_error/>
            {move || state.with(|s| s.metrics_error.clone()).map(|_| view! {
                <div class="alert alert-warning">"Monitoring data is unavailable; usage is shown as 0."</div>
            })}

            <table class="table">
                <thead>
                    <tr>
                        <th></th>
                        <th>"Name"</th>
                        <th>"Status"</th>
                        <th>"Role"</th>
                        <th>"CPU"</th>
                        <th>"Memory"</th>
                        <th>"Pods"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    <For
                        each=row_names
                        key=|name| name.clone()
                        children=move |name| {
                            let row = {
                                let name = name.clone();
                                create_memo(move |_| rows.with(|rows| rows.iter().find(|r| r.name == name).cloned()))
                            };
                            view! {
                                <NodeRowView
                                    name=name
                                    row=row
                                    metrics_loading=metrics_loading
                                    selected=selected
                                    busy=busy
                                    on_action=run_action
                                />
                            }
                        }
                    />
                </tbody>
            </table>

            <Pagination page=current_page total_pages=total_pages total=total/>
            <TaintEditor modal=taint_form/>
        </div>
    }
}

#[component]
fn OverviewCard(overview: ReadSignal<NodeOverview>) -> impl IntoView {
    view! {
        <div class="overview-card">
            <div class="overview-item">
                <span class="overview-value">{move || overview.get().total}</span>
                <span class="overview-label">"Nodes"</span>
            </div>
            <div class="overview-item">
                <span class="overview-value">{move || overview.get().masters}</span>
                <span class="overview-label">"Masters"</span>
            </div>
            <div class="overview-item">
                <span class="overview-value">{move || overview.get().workers}</span>
                <span class="overview-label">"Workers"</span>
            </div>
        </div>
    }
}

/// One table row, kept mounted while its node stays listed
#[component]
fn NodeRowView<F>(
    name: String,
    row: Memo<Option<NodeRow>>,
    metrics_loading: Signal<bool>,
    selected: RwSignal<BTreeSet<String>>,
    busy: ReadSignal<bool>,
    on_action: F,
) -> impl IntoView
where
    F: Fn(NodeAction, String) + Copy + 'static,
{
    let checked = {
        let name = name.clone();
        move || selected.with(|s| s.contains(&name))
    };
    let toggle = move |_| {
        selected.update(|s| {
            if !s.remove(&name) {
                s.insert(name.clone());
            }
        })
    };

    view! {
        <tr>
            <td><input type="checkbox" prop:checked=checked on:change=toggle/></td>
            {move || row.get().map(|row| view! {
                <NodeCells row=row metrics_loading=metrics_loading busy=busy on_action=on_action/>
            })}
        </tr>
    }
}

#[component]
fn NodeCells<F>(row: NodeRow, metrics_loading: Signal<bool>, busy: ReadSignal<bool>, on_action: F) -> impl IntoView
where
    F: Fn(NodeAction, String) + Copy + 'static,
{
    let taints = row.taints.clone().map(|badge| {
        let tooltip = badge.lines.join("\n");
        view! { <span class="badge badge-muted" title=tooltip>{badge.count} " taints"</span> }
    });
    let cpu_tooltip = format!("Requests: {}\nLimits: {}", row.cpu_tooltip.requests, row.cpu_tooltip.limits);
    let memory_tooltip = format!(
        "Requests: {}\nLimits: {}",
        row.memory_tooltip.requests, row.memory_tooltip.limits
    );

    let actions = row
        .actions
        .iter()
        .copied()
        .map(|action| {
            let text = match action {
                NodeAction::Uncordon => "Uncordon",
                NodeAction::Cordon => "Cordon",
                NodeAction::Delete => "Delete",
            };
            let node = row.name.clone();
            view! {
                <button
                    class="btn btn-link"
                    disabled=move || busy.get()
                    on:click=move |_| on_action(action, node.clone())
                >
                    {text}
                </button>
            }
        })
        .collect_view();

    view! {
        <td>
            <div class="cell-title">{row.name.clone()}</div>
            <div class="cell-subtitle">{row.ip.clone().unwrap_or_default()}</div>
        </td>
        <td>
            <span class=node_status_class(row.status)>{label(&row.status_label)}</span>
            {taints}
        </td>
        <td>{row.roles.clone()}</td>
        <td title=cpu_tooltip><UsageColumn cell=row.cpu.clone() pending=metrics_loading/></td>
        <td title=memory_tooltip><UsageColumn cell=row.memory.clone() pending=metrics_loading/></td>
        <td><UsageColumn cell=row.pods.clone() pending=metrics_loading/></td>
        <td class="row-actions">{actions}</td>
    }
}
