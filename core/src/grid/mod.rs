pub mod centers;
pub mod template;

pub use centers::{derive_centers, x_centers, y_centers};
pub use template::{derive_template_grid, template_centers, TemplateOps};
