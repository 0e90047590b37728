//! Widgets shared by the console pages

mod taint_editor;

pub use taint_editor::TaintEditor;

use fleetview_common::view::UsageCell;
use leptos::*;

/// Percentage headline, bar and `used/total` detail of one usage column
#[component]
pub fn UsageBar(cell: UsageCell) -> impl IntoView {
    let width = format!("width: {}%", cell.utilization.percent.clamp(0, 100));
    let bar_class = if cell.utilization.warning {
        "usage-bar usage-bar-warning"
    } else {
        "usage-bar"
    };

    view! {
        <div class="usage">
            <div class="usage-headline">
                <span>{cell.utilization.label()}</span>
                {cell.warning_icon.then(|| view! { <span class="usage-warning" title="High usage">"!"</span> })}
            </div>
            <div class="usage-track">
                <div class=bar_class style=width></div>
            </div>
            <div class="usage-detail">{cell.detail}</div>
        </div>
    }
}

/// Usage column that waits on its own metrics fetch
#[component]
pub fn UsageColumn(cell: UsageCell, #[prop(into)] pending: Signal<bool>) -> impl IntoView {
    move || {
        if pending.get() {
            view! { <div class="usage usage-pending">"Loading..."</div> }.into_view()
        } else {
            view! { <UsageBar cell=cell.clone()/> }.into_view()
        }
    }
}

/// Previous/next pager over `page` (1-based)
#[component]
pub fn Pagination(
    page: RwSignal<u32>,
    #[prop(into)] total_pages: Signal<u32>,
    #[prop(into)] total: Signal<usize>,
) -> impl IntoView {
    view! {
        <div class="pagination">
            <span class="pagination-total">"Total: " {total}</span>
            <button
                class="btn btn-secondary"
                disabled=move || page.get() <= 1
                on:click=move |_| page.update(|p| *p = p.saturating_sub(1).max(1))
            >
                "Previous"
            </button>
            <span>{move || format!("{} / {}", page.get(), total_pages.get().max(1))}</span>
            <button
                class="btn btn-secondary"
                disabled=move || page.get() >= total_pages.get()
                on:click=move |_| page.update(|p| *p += 1)
            >
                "Next"
            </button>
        </div>
    }
}

#[component]
pub fn ErrorBanner(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    move || {
        message.get().map(|msg| {
            view! { <div class="alert alert-error">{msg}</div> }
        })
    }
}
