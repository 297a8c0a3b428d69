//! # Authorization Policy
//!
//! A pure decision function over `(caller, action)`. Handlers gather whatever
//! facts an action needs (does the caller own a company, does the job exist,
//! was an application already filed) and pass them in; the policy answers
//! with either a [`Scope`] that downstream lookups must honor, or a
//! [`Denial`] carrying the error taxonomy of the API.
//!
//! Two styles of ownership checks coexist on purpose:
//!
//! * ownership folded into the lookup ([`Scope`] handed to
//!   [`crate::ownership`]), where a non-owned record reads as not-found;
//! * an explicit owner comparison after an unscoped lookup
//!   ([`Action::ListApplicants`]), where a mismatch is forbidden.

use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::{ApiError, conflict, forbidden, not_found, unauthorized};
use crate::models::Role;

pub const EMPLOYER_REQUIRED: &str = "You must be an employer to access this resource.";
pub const CANDIDATE_REQUIRED: &str = "You must be a candidate to access this resource.";
pub const EMPLOYER_OR_ADMIN_REQUIRED: &str =
    "You must be an employer or admin to access this resource.";
pub const NO_COMPANY: &str = "User does not have an associated company";
pub const ALREADY_OWNS_COMPANY: &str = "User already owns a company.";
pub const COMPANY_NAME_TAKEN: &str = "Company Name already exists";
pub const JOB_NOT_FOUND: &str = "Job listing not found";
pub const ALREADY_APPLIED: &str = "You have already applied to this job.";
pub const NOT_JOB_OWNER: &str = "You do not have permission to view applications for this job.";

/// The authenticated caller, passed explicitly into every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub is_staff: bool,
}

impl Identity {
    pub fn is_employer(&self) -> bool {
        self.role == Role::Employer
    }

    pub fn is_candidate(&self) -> bool {
        self.role == Role::Candidate
    }
}

/// Operations subject to authorization, with the facts each one needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Register,
    Login,
    RefreshToken,
    ReadOwnProfile,
    CreateCompany {
        already_owns_company: bool,
        name_taken: bool,
    },
    ReadOwnCompany,
    /// `company_id` is the caller's company, if any
    CreateJob { company_id: Option<Uuid> },
    /// List or read jobs; `company_id` is the caller's company, if any
    ViewJobs { company_id: Option<Uuid> },
    UpdateJob,
    DeleteJob,
    /// Gate for the candidate-side application surface
    ManageOwnApplications,
    Apply { job_exists: bool, already_applied: bool },
    ChangeApplicationStatus,
    /// `job_owner_id` is the owner of the job's company, `None` when the job is missing
    ListApplicants { job_owner_id: Option<Uuid> },
}

/// Ownership predicate a granted action must apply to its lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No ownership predicate
    Unrestricted,
    /// Jobs belonging to this company
    Company(Uuid),
    /// Records whose company is owned by this user
    CompanyOwner(Uuid),
    /// Only active job listings
    ActiveJobs,
    /// Applications submitted by this user
    Applicant(Uuid),
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden(&'static str),
    NotFound(&'static str),
    Conflict(&'static str),
    Validation(&'static str),
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => unauthorized(None),
            Denial::Forbidden(reason) => forbidden(Some(reason)),
            Denial::NotFound(reason) => not_found(reason),
            Denial::Conflict(reason) => conflict(reason),
            Denial::Validation(reason) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", reason)
            }
        }
    }
}

/// Deployment-level policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Lets employer accounts use the application surface like candidates
    pub employers_may_apply: bool,
}

impl Policy {
    pub fn new(employers_may_apply: bool) -> Self {
        Self {
            employers_may_apply,
        }
    }

    /// Decide whether `caller` may perform `action`.
    pub fn authorize(&self, caller: Option<&Identity>, action: &Action) -> Result<Scope, Denial> {
        let caller = match (caller, action) {
            (_, Action::Register | Action::Login | Action::RefreshToken) => {
                return Ok(Scope::Unrestricted);
            }
            (None, _) => return Err(Denial::Unauthenticated),
            (Some(caller), _) => caller,
        };

        match *action {
            Action::Register | Action::Login | Action::RefreshToken | Action::ReadOwnProfile => {
                Ok(Scope::Unrestricted)
            }

            Action::CreateCompany {
                already_owns_company,
                name_taken,
            } => {
                require_employer(caller)?;
                if already_owns_company {
                    return Err(Denial::Conflict(ALREADY_OWNS_COMPANY));
                }
                if name_taken {
                    return Err(Denial::Conflict(COMPANY_NAME_TAKEN));
                }
                Ok(Scope::CompanyOwner(caller.user_id))
            }

            Action::ReadOwnCompany => {
                require_employer(caller)?;
                Ok(Scope::CompanyOwner(caller.user_id))
            }

            Action::CreateJob { company_id } => {
                require_employer(caller)?;
                company_id
                    .map(Scope::Company)
                    .ok_or(Denial::NotFound(NO_COMPANY))
            }

            Action::ViewJobs { company_id } => {
                if caller.is_employer() {
                    company_id
                        .map(Scope::Company)
                        .ok_or(Denial::NotFound(NO_COMPANY))
                } else {
                    Ok(Scope::ActiveJobs)
                }
            }

            Action::UpdateJob => {
                require_employer(caller)?;
                Ok(Scope::CompanyOwner(caller.user_id))
            }

            Action::DeleteJob => {
                if caller.is_staff {
                    Ok(Scope::Unrestricted)
                } else if caller.is_employer() {
                    Ok(Scope::CompanyOwner(caller.user_id))
                } else {
                    Err(Denial::Forbidden(EMPLOYER_OR_ADMIN_REQUIRED))
                }
            }

            Action::ManageOwnApplications => {
                self.require_applicant(caller)?;
                Ok(Scope::Applicant(caller.user_id))
            }

            Action::Apply {
                job_exists,
                already_applied,
            } => {
                self.require_applicant(caller)?;
                if !job_exists {
                    return Err(Denial::NotFound(JOB_NOT_FOUND));
                }
                if already_applied {
                    return Err(Denial::Validation(ALREADY_APPLIED));
                }
                Ok(Scope::Applicant(caller.user_id))
            }

            Action::ChangeApplicationStatus => {
                require_employer(caller)?;
                Ok(Scope::CompanyOwner(caller.user_id))
            }

            Action::ListApplicants { job_owner_id } => {
                require_employer(caller)?;
                match job_owner_id {
                    None => Err(Denial::NotFound(JOB_NOT_FOUND)),
                    Some(owner) if owner != caller.user_id => {
                        Err(Denial::Forbidden(NOT_JOB_OWNER))
                    }
                    Some(_) => Ok(Scope::CompanyOwner(caller.user_id)),
                }
            }
        }
    }

    fn require_applicant(&self, caller: &Identity) -> Result<(), Denial> {
        if caller.is_candidate() || (self.employers_may_apply && caller.is_employer()) {
            Ok(())
        } else {
            Err(Denial::Forbidden(CANDIDATE_REQUIRED))
        }
    }
}

fn require_employer(caller: &Identity) -> Result<(), Denial> {
    if caller.is_employer() {
        Ok(())
    } else {
        Err(Denial::Forbidden(EMPLOYER_REQUIRED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employer() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            role: Role::Employer,
            is_staff: false,
        }
    }

    fn candidate() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            role: Role::Candidate,
            is_staff: false,
        }
    }

    fn staff(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            role,
            is_staff: true,
        }
    }

    #[test]
    fn unauthenticated_only_reaches_public_actions() {
        let policy = Policy::default();

        for action in [Action::Register, Action::Login, Action::RefreshToken] {
            assert_eq!(policy.authorize(None, &action), Ok(Scope::Unrestricted));
        }

        for action in [
            Action::ReadOwnProfile,
            Action::UpdateJob,
            Action::DeleteJob,
            Action::ManageOwnApplications,
            Action::ViewJobs { company_id: None },
        ] {
            assert_eq!(
                policy.authorize(None, &action),
                Err(Denial::Unauthenticated)
            );
        }
    }

    #[test]
    fn company_creation_requires_employer_then_checks_conflicts() {
        let policy = Policy::default();
        let owner = employer();

        let free = Action::CreateCompany {
            already_owns_company: false,
            name_taken: false,
        };
        assert_eq!(
            policy.authorize(Some(&owner), &free),
            Ok(Scope::CompanyOwner(owner.user_id))
        );
        assert_eq!(
            policy.authorize(Some(&candidate()), &free),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );

        let both = Action::CreateCompany {
            already_owns_company: true,
            name_taken: true,
        };
        assert_eq!(
            policy.authorize(Some(&owner), &both),
            Err(Denial::Conflict(ALREADY_OWNS_COMPANY))
        );

        let taken = Action::CreateCompany {
            already_owns_company: false,
            name_taken: true,
        };
        assert_eq!(
            policy.authorize(Some(&owner), &taken),
            Err(Denial::Conflict(COMPANY_NAME_TAKEN))
        );

        // Role is checked before any conflict is surfaced
        assert_eq!(
            policy.authorize(Some(&candidate()), &both),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );
    }

    #[test]
    fn job_creation_distinguishes_wrong_role_from_missing_company() {
        let policy = Policy::default();
        let company = Uuid::new_v4();

        assert_eq!(
            policy.authorize(
                Some(&candidate()),
                &Action::CreateJob {
                    company_id: Some(company)
                }
            ),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );
        assert_eq!(
            policy.authorize(Some(&employer()), &Action::CreateJob { company_id: None }),
            Err(Denial::NotFound(NO_COMPANY))
        );
        assert_eq!(
            policy.authorize(
                Some(&employer()),
                &Action::CreateJob {
                    company_id: Some(company)
                }
            ),
            Ok(Scope::Company(company))
        );
    }

    #[test]
    fn job_visibility_depends_on_role() {
        let policy = Policy::default();
        let company = Uuid::new_v4();

        assert_eq!(
            policy.authorize(
                Some(&employer()),
                &Action::ViewJobs {
                    company_id: Some(company)
                }
            ),
            Ok(Scope::Company(company))
        );
        assert_eq!(
            policy.authorize(Some(&employer()), &Action::ViewJobs { company_id: None }),
            Err(Denial::NotFound(NO_COMPANY))
        );
        assert_eq!(
            policy.authorize(Some(&candidate()), &Action::ViewJobs { company_id: None }),
            Ok(Scope::ActiveJobs)
        );
        // Staff get no unscoped view
        assert_eq!(
            policy.authorize(
                Some(&staff(Role::Candidate)),
                &Action::ViewJobs { company_id: None }
            ),
            Ok(Scope::ActiveJobs)
        );
    }

    #[test]
    fn job_update_folds_ownership_into_lookup() {
        let policy = Policy::default();
        let owner = employer();

        assert_eq!(
            policy.authorize(Some(&owner), &Action::UpdateJob),
            Ok(Scope::CompanyOwner(owner.user_id))
        );
        assert_eq!(
            policy.authorize(Some(&candidate()), &Action::UpdateJob),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );
    }

    #[test]
    fn job_delete_allows_owner_or_staff() {
        let policy = Policy::default();
        let owner = employer();

        assert_eq!(
            policy.authorize(Some(&owner), &Action::DeleteJob),
            Ok(Scope::CompanyOwner(owner.user_id))
        );
        assert_eq!(
            policy.authorize(Some(&candidate()), &Action::DeleteJob),
            Err(Denial::Forbidden(EMPLOYER_OR_ADMIN_REQUIRED))
        );
        assert_eq!(
            policy.authorize(Some(&staff(Role::Candidate)), &Action::DeleteJob),
            Ok(Scope::Unrestricted)
        );
        assert_eq!(
            policy.authorize(Some(&staff(Role::Employer)), &Action::DeleteJob),
            Ok(Scope::Unrestricted)
        );
    }

    #[test]
    fn applications_are_candidate_only_by_default() {
        let policy = Policy::default();
        let applicant = candidate();

        assert_eq!(
            policy.authorize(Some(&applicant), &Action::ManageOwnApplications),
            Ok(Scope::Applicant(applicant.user_id))
        );
        assert_eq!(
            policy.authorize(Some(&employer()), &Action::ManageOwnApplications),
            Err(Denial::Forbidden(CANDIDATE_REQUIRED))
        );
        assert_eq!(
            policy.authorize(
                Some(&employer()),
                &Action::Apply {
                    job_exists: true,
                    already_applied: false
                }
            ),
            Err(Denial::Forbidden(CANDIDATE_REQUIRED))
        );
    }

    #[test]
    fn employers_may_apply_when_enabled() {
        let policy = Policy::new(true);
        let applicant = employer();

        assert_eq!(
            policy.authorize(
                Some(&applicant),
                &Action::Apply {
                    job_exists: true,
                    already_applied: false
                }
            ),
            Ok(Scope::Applicant(applicant.user_id))
        );
    }

    #[test]
    fn apply_checks_job_then_duplicates() {
        let policy = Policy::default();
        let applicant = candidate();

        assert_eq!(
            policy.authorize(
                Some(&applicant),
                &Action::Apply {
                    job_exists: false,
                    already_applied: false
                }
            ),
            Err(Denial::NotFound(JOB_NOT_FOUND))
        );
        assert_eq!(
            policy.authorize(
                Some(&applicant),
                &Action::Apply {
                    job_exists: true,
                    already_applied: true
                }
            ),
            Err(Denial::Validation(ALREADY_APPLIED))
        );
    }

    #[test]
    fn status_change_is_scoped_to_job_owner() {
        let policy = Policy::default();
        let owner = employer();

        assert_eq!(
            policy.authorize(Some(&owner), &Action::ChangeApplicationStatus),
            Ok(Scope::CompanyOwner(owner.user_id))
        );
        assert_eq!(
            policy.authorize(Some(&candidate()), &Action::ChangeApplicationStatus),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );
    }

    #[test]
    fn applicant_listing_surfaces_owner_mismatch_as_forbidden() {
        let policy = Policy::default();
        let owner = employer();
        let other = employer();

        assert_eq!(
            policy.authorize(
                Some(&owner),
                &Action::ListApplicants {
                    job_owner_id: Some(owner.user_id)
                }
            ),
            Ok(Scope::CompanyOwner(owner.user_id))
        );
        assert_eq!(
            policy.authorize(
                Some(&other),
                &Action::ListApplicants {
                    job_owner_id: Some(owner.user_id)
                }
            ),
            Err(Denial::Forbidden(NOT_JOB_OWNER))
        );
        assert_eq!(
            policy.authorize(Some(&owner), &Action::ListApplicants { job_owner_id: None }),
            Err(Denial::NotFound(JOB_NOT_FOUND))
        );
        assert_eq!(
            policy.authorize(
                Some(&candidate()),
                &Action::ListApplicants { job_owner_id: None }
            ),
            Err(Denial::Forbidden(EMPLOYER_REQUIRED))
        );
    }

    #[test]
    fn denials_map_to_api_statuses() {
        let cases = [
            (Denial::Unauthenticated, StatusCode::UNAUTHORIZED),
            (Denial::Forbidden(EMPLOYER_REQUIRED), StatusCode::FORBIDDEN),
            (Denial::NotFound(NO_COMPANY), StatusCode::NOT_FOUND),
            (Denial::Conflict(ALREADY_OWNS_COMPANY), StatusCode::CONFLICT),
            (Denial::Validation(ALREADY_APPLIED), StatusCode::BAD_REQUEST),
        ];

        for (denial, status) in cases {
            let error: ApiError = denial.into();
            assert_eq!(error.status, status);
        }
    }
}
