mod chat_list;
mod chat_thread;
mod generic;
mod hosting;
mod page;

pub use chat_list::ChatListView;
pub use chat_thread::ChatThreadView;
pub use generic::GenericView;
pub use hosting::HostingView;

use crate::resources::{PageKind, ResourceDef, Resources};
use crate::ui::view::View;

/// Mount the page for a resource definition.
pub fn open_page(resources: &Resources, def: &ResourceDef) -> Box<dyn View> {
  match def.kind {
    PageKind::Hosting => Box::new(HostingView::new(resources.bind(def), &def.title)),
    PageKind::ChatList => Box::new(ChatListView::new(resources.clone(), def.clone())),
    PageKind::ChatThread => Box::new(ChatThreadView::new(resources, def.clone())),
    PageKind::Generic => Box::new(GenericView::new(resources.bind(def), &def.title)),
  }
}
