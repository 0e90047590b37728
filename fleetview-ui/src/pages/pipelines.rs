//! DevOps Pipeline List Page

use crate::api;
use crate::collaborators::{page_collaborators, ModalSlot};
use crate::components::{ErrorBanner, Pagination};
use crate::config::UiConfig;
use crate::utils::{health_icon, label, run_status_class};
use fleetview_common::action::ActionPhase;
use fleetview_common::controller::{PipelinesController, RunForm};
use fleetview_common::list::DEFAULT_PAGE_SIZE;
use fleetview_common::pipeline::{Discarder, PipelineConfig, PipelineRecord, RunRequest, RunStatus};
use fleetview_common::view::{PipelineAction, PipelineRow, PipelineStatusCell};
use fleetview_common::ListQuery;
use leptos::*;
use leptos_router::*;
use std::collections::BTreeSet;
use std::rc::Rc;

#[component]
pub fn PipelinesPage() -> impl IntoView {
    let params = use_params_map();
    let param = move |key: &str| params.with(|p| p.get(key).cloned().unwrap_or_default());

    move || {
        let workspace = param("workspace");
        let cluster = param("cluster");
        let devops = param("devops");
        view! { <PipelineList workspace=workspace cluster=cluster devops=devops/> }
    }
}

#[component]
fn PipelineList(workspace: String, cluster: String, devops: String) -> impl IntoView {
    let config = use_context::<UiConfig>().unwrap_or_default();
    let ctx = config.context(Some(&workspace), Some(&cluster));
    let run_form = ModalSlot::<RunForm>::new();
    let config_form = ModalSlot::<PipelineConfig>::new();
    let controller = Rc::new(PipelinesController::new(
        ctx.clone(),
        &devops,
        Rc::new(api::client(&config.api_root)),
        page_collaborators(),
        run_form.clone(),
        config_form.clone(),
    ));

    let (state, set_state) = create_signal(controller.state());
    let (busy, set_busy) = create_signal(false);
    controller.aggregator().subscribe(move |s| set_state.set(s.clone()));
    controller
        .dispatcher()
        .subscribe(move |phase| set_busy.set(*phase != ActionPhase::Idle));

    let prefix = controller.prefix().to_string();
    let can_create = controller.can_create();
    let page = store_value(controller);
    on_cleanup(move || {
        page.try_with_value(|p| p.dispose());
    });

    let current_page = create_rw_signal(1u32);
    let (search, set_search) = create_signal(String::new());
    let (status_filter, set_status_filter) = create_signal(String::new());
    let selected = create_rw_signal(BTreeSet::<String>::new());

    create_effect(move |_| {
        let query = ListQuery::page(current_page.get(), DEFAULT_PAGE_SIZE)
            .with_filter("name", search.get().trim())
            .with_filter("status", &status_filter.get());
        let page = page.get_value();
        spawn_local(async move { page.load(query).await });
    });

    let row_ctx = ctx.clone();
    let row_prefix = prefix.clone();
    let rows = move || {
        state.with(|s| {
            s.list
                .items
                .iter()
                .map(|record| PipelineRow::project(&row_ctx, &row_prefix, record))
                .collect::<Vec<_>>()
        })
    };
    let empty = move || state.with(|s| s.list.is_empty_state());

    let run_action = move |action: PipelineAction, name: String| {
        let page = page.get_value();
        spawn_local(async move {
            match action {
                PipelineAction::Run => {
                    page.run(&name).await;
                }
                PipelineAction::Activity => page.activity(&name),
                PipelineAction::Edit => {
                    page.edit(&name).await;
                }
                PipelineAction::Delete => {
                    page.delete(&name).await;
                }
            }
        });
    };

    let create = move |_| {
        let page = page.get_value();
        spawn_local(async move {
            page.create().await;
        });
    };

    let batch_delete = move |_| {
        let page = page.get_value();
        let names: Vec<String> = selected.get_untracked().into_iter().collect();
        spawn_local(async move {
            if page.batch_delete(names).await.is_success() {
                selected.set(BTreeSet::new());
            }
        });
    };

    let allow_delete = ctx.allows(PipelineAction::Delete.permission());
    let total_pages = Signal::derive(move || state.with(|s| s.list.total_pages()));
    let total = Signal::derive(move || state.with(|s| s.list.total));
    let list_error = Signal::derive(move || state.with(|s| s.list.error.clone()));

    view! {
        <div class="page">
            <div class="page-header">
                <div>
                    <h1>"Pipelines"</h1>
                    <p class="page-subtitle">"DevOps project: " {devops.clone()}</p>
                </div>
                {can_create.then(|| view! {
                    <button class="btn btn-primary" disabled=move || busy.get() on:click=create>"Create"</button>
                })}
            </div>

            <Show
                when=move || !empty()
                fallback=move || view! {
                    <div class="empty-state">
                        <h3>"No pipelines yet"</h3>
                        <p>"Pipelines automate building, testing and releasing code in this DevOps project."</p>
                        {can_create.then(|| view! {
                            <button class="btn btn-primary" on:click=create>"Create Pipeline"</button>
                        })}
                    </div>
                }
            >
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
                        {RunStatus::filter_options()
                            .into_iter()
                            .map(|status| view! { <option value=status.as_str()>{label(&status.label_key())}</option> })
                            .collect_view()}
                    </select>
                    {allow_delete.then(|| view! {
                        <button
                            class="btn btn-secondary"
                            disabled=move || busy.get() || selected.with(BTreeSet::is_empty)
                            on:click=batch_delete
                        >
                            "Delete"
                        </button>
                    })}
                </div>

                <ErrorBanner message=list_error/>

                <table class="table">
                    <thead>
                        <tr>
                            <th></th>
                            <th>"Name"</th>
                            <th>"Status"</th>
                            <th>"Health"</th>
                            <th>"Branches"</th>
                            <th>"Pull Requests"</th>
                            <th></th>
                        </tr>
                    </thead>
                    <tbody>
                        <For
                            each=rows.clone()
                            key=|row| format!("{:?}", row)
                            children=move |row| view! {
                                <PipelineRowView row=row selected=selected busy=busy on_action=run_action/>
                            }
                        />
                    </tbody>
                </table>

                <Pagination page=current_page total_pages=total_pages total=total/>
            </Show>

            <RunModal modal=run_form page=page/>
            <ConfigModal modal=config_form/>
        </div>
    }
}

#[component]
fn PipelineRowView<F>(
    row: PipelineRow,
    selected: RwSignal<BTreeSet<String>>,
    busy: ReadSignal<bool>,
    on_action: F,
) -> impl IntoView
where
    F: Fn(PipelineAction, String) + Copy + 'static,
{
    let name = row.name.clone();
    let checked = {
        let name = name.clone();
        move || selected.with(|s| s.contains(&name))
    };
    let toggle = {
        let name = name.clone();
        move |_| {
            selected.update(|s| {
                if !s.remove(&name) {
                    s.insert(name.clone());
                }
            })
        }
    };

    let status = match &row.status {
        PipelineStatusCell::Branches { .. } => view! { <span class="badge badge-success">{row.status.text()}</span> },
        PipelineStatusCell::Run(run) => view! { <span class=run_status_class(*run)>{label(&row.status.text())}</span> },
    };

    let actions = row
        .actions
        .iter()
        .copied()
        .map(|action| {
            let text = match action {
                PipelineAction::Run => "Run",
                PipelineAction::Activity => "Activity",
                PipelineAction::Edit => "Edit",
                PipelineAction::Delete => "Delete",
            };
            let pipeline = name.clone();
            view! {
                <button class="btn btn-link" disabled=move || busy.get() on:click=move |_| on_action(action, pipeline.clone())>
                    {text}
                </button>
            }
        })
        .collect_view();

    view! {
        <tr>
            <td><input type="checkbox" prop:checked=checked on:change=toggle/></td>
            <td><A href=row.link.clone()>{row.name.clone()}</A></td>
            <td>{status}</td>
            <td title=row.health.as_str()>{health_icon(row.health)}</td>
            <td>{row.branches.clone()}</td>
            <td>{row.pull_requests.clone()}</td>
            <td class="row-actions">{actions}</td>
        </tr>
    }
}

/// Branch and parameter form shown before a run
#[component]
fn RunModal(modal: Rc<ModalSlot<RunForm>>, page: StoredValue<Rc<PipelinesController>>) -> impl IntoView {
    let draft = modal.draft();
    let slot = store_value(modal);

    // A new branch brings its own parameter definitions
    let choose_branch = move |branch: String| {
        slot.with_value(|s| s.edit(|form| form.request.branch = Some(branch.clone())));
        let Some(pipeline) = draft.with_untracked(|d| d.as_ref().map(|form| form.pipeline.clone())) else {
            return;
        };
        let page = page.get_value();
        spawn_local(async move {
            match page.branch_parameters(&pipeline, &branch).await {
                Ok(parameters) => slot.with_value(|s| {
                    s.edit(|form| {
                        let record = PipelineRecord {
                            name: form.pipeline.clone(),
                            parameters: parameters.clone(),
                            ..Default::default()
                        };
                        form.parameters = parameters;
                        form.request = RunRequest::defaults(&record, Some(branch));
                    })
                }),
                Err(e) => logging::warn!("Branch parameters for {}: {}", pipeline, e),
            }
        });
    };

    let branches = move || draft.with(|d| d.as_ref().map(|f| f.branches.clone()).unwrap_or_default());
    let current_branch = move || {
        draft.with(|d| {
            d.as_ref()
                .and_then(|f| f.request.branch.clone())
                .unwrap_or_default()
        })
    };
    let parameters = move || {
        draft.with(|d| {
            d.as_ref()
                .map(|f| f.request.parameters.iter().enumerate().map(|(i, p)| (i, p.clone())).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    };
    let title = move || draft.with(|d| d.as_ref().map(|f| format!("Run {}", f.pipeline)).unwrap_or_default());

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <div class="modal-backdrop">
                <div class="modal">
                    <h3>{title}</h3>
                    <Show when=move || !branches().is_empty()>
                        <label class="form-label">"Branch"</label>
                        <select on:change=move |ev| choose_branch(event_target_value(&ev))>
                            {move || branches()
                                .into_iter()
                                .map(|branch| {
                                    let selected = branch == current_branch();
                                    view! { <option value=branch.clone() selected=selected>{branch.clone()}</option> }
                                })
                                .collect_view()}
                        </select>
                    </Show>
                    <For
                        each=parameters
                        key=|(i, p)| (*i, p.name.clone())
                        children=move |(index, parameter)| view! {
                            <label class="form-label">{parameter.name.clone()}</label>
                            <input
                                type="text"
                                prop:value=parameter.value.clone()
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    slot.with_value(|s| s.edit(|form| {
                                        if let Some(p) = form.request.parameters.get_mut(index) {
                                            p.value = value;
                                        }
                                    }))
                                }
                            />
                        }
                    />
                    <div class="modal-actions">
                        <button class="btn btn-secondary" on:click=move |_| slot.with_value(|s| s.finish(false))>"Cancel"</button>
                        <button class="btn btn-primary" on:click=move |_| slot.with_value(|s| s.finish(true))>"Run"</button>
                    </div>
                </div>
            </div>
        </Show>
    }
}

fn discarder(config: &mut PipelineConfig) -> &mut Discarder {
    config.discarder.get_or_insert_with(|| Discarder {
        days_to_keep: "7".to_string(),
        num_to_keep: "10".to_string(),
    })
}

/// Create/edit form for a pipeline's basic settings
#[component]
fn ConfigModal(modal: Rc<ModalSlot<PipelineConfig>>) -> impl IntoView {
    let draft = modal.draft();
    let slot = store_value(modal);

    // Existing pipelines keep their name
    let lock = create_memo(move |previous: Option<&Option<bool>>| {
        draft.with(|d| {
            d.as_ref()
                .map(|config| previous.copied().flatten().unwrap_or(!config.name.is_empty()))
        })
    });
    let name_locked = move || lock.get() == Some(true);
    let field = move |read: fn(&PipelineConfig) -> String| {
        move || draft.with(|d| d.as_ref().map(read).unwrap_or_default())
    };
    let flag = move |read: fn(&PipelineConfig) -> bool| {
        move || draft.with(|d| d.as_ref().map(read).unwrap_or(false))
    };
    let edit = move |change: Box<dyn FnOnce(&mut PipelineConfig)>| slot.with_value(|s| s.edit(change));

    view! {
        <Show when=move || draft.with(Option::is_some)>
            <div class="modal-backdrop">
                <div class="modal">
                    <h3>{move || if name_locked() { "Edit Pipeline" } else { "Create Pipeline" }}</h3>

                    <label class="form-label">"Name"</label>
                    <input
                        type="text"
                        disabled=move || name_locked()
                        prop:value=field(|c| c.name.clone())
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            edit(Box::new(move |c| c.name = value));
                        }
                    />

                    <label class="form-label">"Description"</label>
                    <textarea
                        prop:value=field(|c| c.description.clone().unwrap_or_default())
                        on:input=move |ev| {
                            let value = event_target_value(&ev);
                            edit(Box::new(move |c| c.description = Some(value).filter(|v| !v.is_empty())));
                        }
                    ></textarea>

                    <label class="form-check">
                        <input
                            type="checkbox"
                            prop:checked=flag(|c| c.enable_discarder)
                            on:change=move |ev| {
                                let on = event_target_checked(&ev);
                                edit(Box::new(move |c| {
                                    c.enable_discarder = on;
                                    if on {
                                        discarder(c);
                                    }
                                }));
                            }
                        />
                        "Discard old builds"
                    </label>
                    <Show when=flag(|c| c.enable_discarder)>
                        <div class="form-row">
                            <input
                                type="text"
                                placeholder="Days to keep"
                                prop:value=field(|c| c.discarder.as_ref().map(|d| d.days_to_keep.clone()).unwrap_or_default())
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    edit(Box::new(move |c| {
                                        discarder(c).days_to_keep = value;
                                    }));
                                }
                            />
                            <input
                                type="text"
                                placeholder="Builds to keep"
                                prop:value=field(|c| c.discarder.as_ref().map(|d| d.num_to_keep.clone()).unwrap_or_default())
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    edit(Box::new(move |c| {
                                        discarder(c).num_to_keep = value;
                                    }));
                                }
                            />
                        </div>
                    </Show>

                    <label class="form-check">
                        <input
                            type="checkbox"
                            prop:checked=flag(|c| c.enable_timer_trigger)
                            on:change=move |ev| {
                                let on = event_target_checked(&ev);
                                edit(Box::new(move |c| c.enable_timer_trigger = on));
                            }
                        />
                        "Scheduled builds"
                    </label>
                    <Show when=flag(|c| c.enable_timer_trigger)>
                        <input
                            type="text"
                            placeholder="Cron schedule, e.g. H 2 * * *"
                            prop:value=field(|c| c.timer_trigger.clone().unwrap_or_default())
                            on:input=move |ev| {
                                let value = event_target_value(&ev);
                                edit(Box::new(move |c| c.timer_trigger = Some(value).filter(|v| !v.is_empty())));
                            }
                        />
                    </Show>

                    <div class="modal-actions">
                        <button class="btn btn-secondary" on:click=move |_| slot.with_value(|s| s.finish(false))>"Cancel"</button>
                        <button
                            class="btn btn-primary"
                            disabled=move || draft.with(|d| d.as_ref().map_or(true, |c| c.name.trim().is_empty()))
                            on:click=move |_| slot.with_value(|s| s.finish(true))
                        >
                            "Save"
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}
