// lib/src/services/bootstrap.rs

use log::info;
use models::{NewStaff, Role, ServiceResult, Staff};

use super::StaffService;
use crate::config::BootstrapConfig;

/// Creates the configured administrator unless an account with that email exists.
pub async fn ensure_admin(staff: &StaffService, config: &BootstrapConfig) -> ServiceResult<Staff> {
    if let Some(existing) = staff.get_by_email(&config.email).await? {
        info!("Admin account {} already present", existing.email);
        return Ok(existing);
    }

    let admin = NewStaff {
        employee_id: config.employee_id.clone(),
        first_name: config.first_name.clone(),
        last_name: config.last_name.clone(),
        phone_number: config.phone_number.clone(),
        email: config.email.clone(),
        password: config.password.clone(),
        role: Role::Admin,
        license_number: None,
        specialization: None,
        department: None,
    };
    let created = staff.register(admin).await?;
    info!("Created admin account {} (id {})", created.email, created.id);
    Ok(created)
}
