//! Shared fixtures for unit tests.

use crate::models::{
    Address, DoctorPersonal, DoctorProfile, EmergencyContact, Gender, PatientPersonal,
    PatientProfile, PracticeInfo, ProfessionalInfo,
};

pub(crate) fn sample_doctor_profile() -> DoctorProfile {
    DoctorProfile {
        personal: DoctorPersonal {
            first_name: "Meena".into(),
            last_name: "Raghavan".into(),
            email: "meena.raghavan@example.org".into(),
            phone: "+91 98400 12345".into(),
        },
        professional: ProfessionalInfo {
            qualification: "BSMS".into(),
            registration_number: "TN-SID-4521".into(),
            specialty: Some("Siddha general practice".into()),
            years_of_experience: Some(12),
        },
        practice: PracticeInfo {
            clinic_name: "Arogya Siddha Clinic".into(),
            address: Some("12 Temple St, Chennai".into()),
            consultation_hours: Some("09:00-17:00".into()),
        },
    }
}

pub(crate) fn sample_patient_profile() -> PatientProfile {
    PatientProfile {
        personal: PatientPersonal {
            first_name: "Kavitha".into(),
            last_name: "Suresh".into(),
            email: "kavitha.s@example.org".into(),
            phone: "+91 98400 67890".into(),
            date_of_birth: "1990-04-12".into(),
            gender: Gender::Female,
            work_type: "medium".into(),
            occupation: Some("teacher".into()),
        },
        address: Address {
            line1: "4 Lake View Rd".into(),
            line2: None,
            city: "Chennai".into(),
            state: "TN".into(),
            postal_code: "600033".into(),
        },
        emergency_contact: EmergencyContact {
            name: "Suresh Kumar".into(),
            relationship: "spouse".into(),
            phone: "+91 98400 11111".into(),
        },
    }
}
