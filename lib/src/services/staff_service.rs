// lib/src/services/staff_service.rs

use chrono::Utc;
use log::{info, warn};
use models::{
    normalize_email, Actor, EntityId, NewStaff, ServiceError, ServiceResult, Staff, StaffProfile,
    StaffUpdate,
};

use super::authorization::{authorize, authorize_staff_read, Operation};
use crate::errors::StorageError;
use crate::storage_engine::Repositories;

#[derive(Clone)]
pub struct StaffService {
    repos: Repositories,
}

impl StaffService {
    pub fn new(repos: Repositories) -> Self {
        StaffService { repos }
    }

    pub async fn create(&self, actor: &Actor, input: NewStaff) -> ServiceResult<StaffProfile> {
        authorize(actor, Operation::ManageStaff)?;
        let saved = self.register(input).await?;
        info!("Staff {} ({}) created by admin {}", saved.id, saved.role, actor.staff_id);
        Ok(saved.profile())
    }

    /// Hashes the password off the async runtime and stores the record.
    pub(crate) async fn register(&self, input: NewStaff) -> ServiceResult<Staff> {
        let now = Utc::now();
        let staff = tokio::task::spawn_blocking(move || Staff::from_new_staff(input, now))
            .await
            .map_err(StorageError::from)??;
        Ok(self.repos.staff.create(staff).await?)
    }

    pub async fn get_all(&self, actor: &Actor) -> ServiceResult<Vec<StaffProfile>> {
        authorize(actor, Operation::ManageStaff)?;
        let staff = self.repos.staff.find_all().await?;
        Ok(staff.iter().map(StaffProfile::from).collect())
    }

    pub async fn get_by_id(&self, actor: &Actor, id: EntityId) -> ServiceResult<StaffProfile> {
        authorize_staff_read(actor, id)?;
        Ok(self.find(id).await?.profile())
    }

    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Option<Staff>> {
        Ok(self.repos.staff.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn get_by_employee_id(&self, employee_id: &str) -> ServiceResult<Option<Staff>> {
        Ok(self.repos.staff.find_by_employee_id(employee_id).await?)
    }

    pub async fn update(&self, actor: &Actor, id: EntityId, update: StaffUpdate) -> ServiceResult<StaffProfile> {
        authorize(actor, Operation::ManageStaff)?;
        let mut staff = self.find(id).await?;
        update.apply_to(&mut staff, Utc::now())?;
        let saved = self.repos.staff.update(staff).await?;
        Ok(saved.profile())
    }

    pub async fn delete(&self, actor: &Actor, id: EntityId) -> ServiceResult<()> {
        authorize(actor, Operation::ManageStaff)?;
        self.find(id).await?;
        self.repos.staff.delete(id).await?;
        info!("Staff {} deleted by admin {}", id, actor.staff_id);
        Ok(())
    }

    pub async fn record_login(&self, id: EntityId) -> ServiceResult<Staff> {
        let mut staff = self.find(id).await?;
        staff.last_login = Some(Utc::now());
        Ok(self.repos.staff.update(staff).await?)
    }

    /// Turns an authenticated staff id into the acting identity, using the
    /// stored role and active flag.
    pub async fn resolve_actor(&self, staff_id: EntityId) -> ServiceResult<Actor> {
        let staff = self
            .repos
            .staff
            .find_by_id(staff_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("staff account no longer exists".to_string()))?;
        if !staff.is_active {
            warn!("Inactive staff {} attempted access", staff_id);
            return Err(ServiceError::Forbidden("account inactive".to_string()));
        }
        Ok(Actor::new(staff.id, staff.role))
    }

    async fn find(&self, id: EntityId) -> ServiceResult<Staff> {
        self.repos
            .staff
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("staff not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::fixture;
    use models::{Role, ValidationError};

    fn new_doctor(email: &str, employee_id: &str) -> NewStaff {
        NewStaff {
            employee_id: employee_id.to_string(),
            first_name: "Ngozi".to_string(),
            last_name: "Okafor".to_string(),
            phone_number: "+2348022222222".to_string(),
            email: email.to_string(),
            password: "Doctor@123".to_string(),
            role: Role::Doctor,
            license_number: Some("MDCN-998".to_string()),
            specialization: Some("neurology".to_string()),
            department: Some("neurology".to_string()),
        }
    }

    #[tokio::test]
    async fn should_create_staff_as_admin_only() {
        let fx = fixture().await;
        let err = fx
            .services
            .staff
            .create(&fx.receptionist, new_doctor("n.okafor@hospital.com", "DOC0100"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let profile = fx
            .services
            .staff
            .create(&fx.admin, new_doctor("N.Okafor@Hospital.com", "DOC0100"))
            .await
            .unwrap();
        assert_eq!(profile.email, "n.okafor@hospital.com");
        assert!(profile.is_active);

        let stored = fx
            .services
            .staff
            .get_by_email("n.okafor@HOSPITAL.com")
            .await
            .unwrap()
            .unwrap();
        assert!(Staff::verify_password("Doctor@123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn should_reject_duplicate_email_and_missing_license() {
        let fx = fixture().await;
        let err = fx
            .services
            .staff
            .create(&fx.admin, new_doctor("doc0001@hospital.com", "DOC0200"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let mut unlicensed = new_doctor("fresh@hospital.com", "DOC0300");
        unlicensed.license_number = None;
        let err = fx
            .services
            .staff
            .create(&fx.admin, unlicensed)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation(ValidationError::MissingLicenseNumber));
    }

    #[tokio::test]
    async fn should_let_staff_read_own_record() {
        let fx = fixture().await;
        let own = fx
            .services
            .staff
            .get_by_id(&fx.doctor, fx.doctor.staff_id)
            .await
            .unwrap();
        assert_eq!(own.role, Role::Doctor);

        let err = fx
            .services
            .staff
            .get_by_id(&fx.doctor, fx.receptionist.staff_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_reject_deactivated_staff() {
        let fx = fixture().await;
        let update = StaffUpdate { is_active: Some(false), ..Default::default() };
        fx.services
            .staff
            .update(&fx.admin, fx.doctor.staff_id, update)
            .await
            .unwrap();

        let err = fx.services.staff.resolve_actor(fx.doctor.staff_id).await.unwrap_err();
        assert_eq!(err, ServiceError::Forbidden("account inactive".to_string()));

        fx.services.staff.delete(&fx.admin, fx.doctor.staff_id).await.unwrap();
        let err = fx.services.staff.resolve_actor(fx.doctor.staff_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn should_validate_staff_updates() {
        let fx = fixture().await;
        let update = StaffUpdate {
            email: Some("   ".to_string()),
            license_number: Some(String::new()),
            ..Default::default()
        };
        let err = fx
            .services
            .staff
            .update(&fx.admin, fx.doctor.staff_id, update)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation(ValidationError::EmptyField("email")));

        let update = StaffUpdate { license_number: Some(" ".to_string()), ..Default::default() };
        let err = fx
            .services
            .staff
            .update(&fx.admin, fx.doctor.staff_id, update)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation(ValidationError::MissingLicenseNumber));

        let stored = fx.repos.staff.find_by_id(fx.doctor.staff_id).await.unwrap().unwrap();
        assert_eq!(stored.email, "doc0001@hospital.com");
        assert_eq!(stored.license_number.as_deref(), Some("LIC-DOC0001"));

        // Receptionists carry no license, so clearing it is allowed.
        let update = StaffUpdate { license_number: Some(String::new()), ..Default::default() };
        fx.services
            .staff
            .update(&fx.admin, fx.receptionist.staff_id, update)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_record_last_login() {
        let fx = fixture().await;
        let staff = fx.services.staff.record_login(fx.receptionist.staff_id).await.unwrap();
        assert!(staff.last_login.is_some());
    }
}
